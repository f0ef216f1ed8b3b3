use crate::model::storage::Credentials;

/// What we found in the token file.
#[derive(Debug)]
pub enum TokenState {
    Absent,
    Invalid(Credentials),
    Valid(Credentials),
}

impl From<Option<Credentials>> for TokenState {
    fn from(credentials: Option<Credentials>) -> Self {
        match credentials {
            None => TokenState::Absent,
            Some(c) if c.invalid => TokenState::Invalid(c),
            Some(c) => TokenState::Valid(c),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub id: String,
    pub name: String,
}

/// One page of a listing. `next_page` is the cursor for the following page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub photos: Vec<Photo>,
    pub next_page: Option<String>,
}
