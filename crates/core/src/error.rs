use thiserror::Error;

use crate::model::UserError;
use crate::model::ids::ParseIdError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
