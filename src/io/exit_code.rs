//! Process exit codes for the CLI (§6: "exit codes 0/1/other").

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    BlockingError = 2,
    NotFound = 3,
    ParseError = 4,
    IoError = 5,
    ConfigError = 6,
    GraphCorrupted = 7,
    UnsupportedOperation = 8,
}

impl ExitCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_zero() {
        assert_eq!(ExitCode::Success.as_u8(), 0);
    }
}
