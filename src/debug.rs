//! Forward output debug printouts from the validation layer to the `log` facade.
//!
//! WARNING: Logger needs to be removed before terminating the application.

use log::Level;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Corruption,
    Error,
    Warning,
    Info,
    Message,
}

const SEVERITY_PREFIXES: [(&str, Severity); 5] = [
    ("D3D12 CORRUPTION:", Severity::Corruption),
    ("D3D12 ERROR:", Severity::Error),
    ("D3D12 WARNING:", Severity::Warning),
    ("D3D12 INFO:", Severity::Info),
    ("D3D12 MESSAGE:", Severity::Message),
];

impl Severity {
    /// Classify a debug layer printout by its prefix.
    ///
    /// Output not produced by the debug layer is treated as a plain message.
    pub fn of_message(message: &str) -> Severity {
        let message = message.trim_start();
        SEVERITY_PREFIXES
            .iter()
            .find(|(prefix, _)| message.starts_with(prefix))
            .map_or(Severity::Message, |&(_, severity)| severity)
    }

    pub fn name(self) -> &'static str {
        match self {
            Severity::Corruption => "CORRUPTION",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
            Severity::Message => "MESSAGE",
        }
    }

    pub fn level(self) -> Level {
        match self {
            Severity::Corruption | Severity::Error => Level::Error,
            Severity::Warning => Level::Warn,
            Severity::Info => Level::Info,
            Severity::Message => Level::Debug,
        }
    }
}

pub fn log_debug_message(message: &str) {
    let message = message.trim_end();
    if message.is_empty() {
        return;
    }
    let severity = Severity::of_message(message);
    log::log!(target: "d3d12", severity.level(), "{}", message);
}

#[cfg(windows)]
mod handler {
    use super::log_debug_message;
    use winapi::um::errhandlingapi::{AddVectoredExceptionHandler, RemoveVectoredExceptionHandler};
    use winapi::um::winnt::{DBG_PRINTEXCEPTION_C, EXCEPTION_POINTERS, LONG};
    use winapi::vc::excpt::{EXCEPTION_CONTINUE_EXECUTION, EXCEPTION_CONTINUE_SEARCH};

    extern "system" fn vectored_handler(exception: *mut EXCEPTION_POINTERS) -> LONG {
        unsafe {
            let rec = &(*(*exception).ExceptionRecord);
            let code = rec.ExceptionCode;

            match code {
                DBG_PRINTEXCEPTION_C => {
                    let len = rec.ExceptionInformation[0];
                    let data = rec.ExceptionInformation[1] as *const u8;

                    if let Ok(string) =
                        std::ffi::CStr::from_bytes_with_nul(std::slice::from_raw_parts(data, len))
                    {
                        log_debug_message(&string.to_string_lossy());
                    }

                    EXCEPTION_CONTINUE_EXECUTION
                }
                _ => EXCEPTION_CONTINUE_SEARCH,
            }
        }
    }

    pub fn debug_logger_add() -> *mut std::ffi::c_void {
        unsafe { AddVectoredExceptionHandler(0, Some(vectored_handler)) }
    }

    pub fn debug_logger_remove(handle: *mut std::ffi::c_void) {
        if !handle.is_null() {
            unsafe {
                RemoveVectoredExceptionHandler(handle);
            }
        }
    }
}

#[cfg(windows)]
pub use self::handler::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_debug_layer_output() {
        assert_eq!(
            Severity::of_message(
                "D3D12 ERROR: ID3D12CommandList::EndQuery: ... [ EXECUTION ERROR #1234: X]"
            ),
            Severity::Error
        );
        assert_eq!(
            Severity::of_message("  D3D12 WARNING: something"),
            Severity::Warning
        );
        assert_eq!(Severity::of_message("D3D12 CORRUPTION: x"), Severity::Corruption);
        assert_eq!(Severity::of_message("D3D12 INFO: x"), Severity::Info);
        assert_eq!(Severity::of_message("unrelated"), Severity::Message);
    }

    #[test]
    fn levels() {
        assert_eq!(Severity::Corruption.level(), Level::Error);
        assert_eq!(Severity::Warning.level(), Level::Warn);
        assert_eq!(Severity::Message.level(), Level::Debug);
        assert_eq!(Severity::Info.name(), "INFO");
    }
}
