use thiserror::Error;

/// Errors with a fixed wire representation. Each variant renders as the text
/// after the `-ERR ` prefix of a RESP simple error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(String),
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("value is out of range, must be positive")]
    NotPositive,
    #[error("invalid expire time in set")]
    InvalidExpireTime,
    #[error("timeout is negative")]
    NegativeTimeout,
    #[error("timeout is not a float or out of range")]
    TimeoutNotFloat,
    #[error("Invalid stream ID specified as stream command argument")]
    BadStreamId,
    #[error("The ID specified in XADD must be greater than 0-0")]
    StreamIdZero,
    #[error("The ID specified in XADD is equal or smaller than the target stream top item")]
    StreamIdNotGreater,
    #[error("EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("nested MULTI")]
    NestedMulti,
}
