use bridge_traits::trigger::TriggerUpdate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The update cannot end a trigger. Carries the rejected update back.
    #[error("Trigger update of kind '{}' is not terminal", .0.kind())]
    NotTerminal(TriggerUpdate),
}

pub type Result<T> = std::result::Result<T, Error>;
