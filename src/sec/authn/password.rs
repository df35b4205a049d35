use argon2::Variant;
use rand::RngCore;

pub const SALT_LEN: usize = 32;

pub type Salt = [u8; SALT_LEN];

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error(transparent)]
    Rand(#[from] rand::Error),

    #[error(transparent)]
    Argon2(#[from] argon2::Error),
}

pub fn gen_salt() -> Result<Salt, rand::Error> {
    let mut salt = [0u8; SALT_LEN];

    rand::thread_rng().try_fill_bytes(&mut salt)?;

    Ok(salt)
}

pub fn gen_hash(password: &str, salt: &[u8]) -> Result<String, argon2::Error> {
    let mut config = argon2::Config::default();
    config.mem_cost = 19456;
    config.variant = Variant::Argon2id;

    argon2::hash_encoded(
        password.as_bytes(),
        salt,
        &config
    )
}

/// salts and hashes a plain text password for storage
pub fn create<P>(password: P) -> Result<String, PasswordError>
where
    P: AsRef<str>
{
    let salt = gen_salt()?;

    Ok(gen_hash(password.as_ref(), &salt)?)
}

pub fn verify<C>(hash: &str, check: C) -> Result<bool, PasswordError>
where
    C: AsRef<[u8]>
{
    Ok(argon2::verify_encoded(hash, check.as_ref())?)
}
