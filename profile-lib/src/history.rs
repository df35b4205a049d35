/// tracks the value a record was loaded with alongside any pending update so
/// a store only writes what was changed
#[derive(Debug)]
pub struct HistoryField<T> {
    original: T,
    updated: Option<T>,
}

impl<T> HistoryField<T> {
    pub fn new(original: T) -> Self {
        HistoryField {
            original,
            updated: None
        }
    }

    pub fn get(&self) -> &T {
        self.updated.as_ref().unwrap_or(&self.original)
    }

    pub fn set(&mut self, v: T) -> Option<T> {
        self.updated.replace(v)
    }

    pub fn original(&self) -> &T {
        &self.original
    }

    pub fn updated(&self) -> Option<&T> {
        self.updated.as_ref()
    }

    pub fn is_updated(&self) -> bool {
        self.updated.is_some()
    }

    pub fn rollback(&mut self) -> Option<T> {
        self.updated.take()
    }

    pub fn commit(&mut self) -> Option<T> {
        if let Some(v) = self.updated.take() {
            Some(std::mem::replace(&mut self.original, v))
        } else {
            None
        }
    }

    pub fn into_inner(self) -> T {
        self.updated.unwrap_or(self.original)
    }
}

impl<T> HistoryField<T>
where
    T: PartialEq
{
    /// only records an update when the value differs from the current one.
    /// returns true if the field was changed
    pub fn set_changed(&mut self, v: T) -> bool {
        if *self.get() == v {
            false
        } else if self.original == v {
            self.updated = None;
            true
        } else {
            self.updated = Some(v);
            true
        }
    }
}

impl<T> std::default::Default for HistoryField<T>
where
    T: std::default::Default
{
    fn default() -> Self {
        HistoryField::new(T::default())
    }
}

impl HistoryField<String> {
    pub fn get_str(&self) -> &str {
        self.get().as_str()
    }
}

impl<T> Clone for HistoryField<T>
where
    T: Clone
{
    fn clone(&self) -> Self {
        HistoryField {
            original: self.original.clone(),
            updated: Option::clone(&self.updated)
        }
    }
}

impl<T> std::ops::Deref for HistoryField<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}

impl<T> PartialEq<T> for HistoryField<T>
where
    T: PartialEq<T>
{
    fn eq(&self, rhs: &T) -> bool {
        self.get().eq(rhs)
    }
}

impl<T> From<T> for HistoryField<T> {
    fn from(v: T) -> Self {
        HistoryField::new(v)
    }
}
