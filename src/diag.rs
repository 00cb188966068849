//! # Structured Diagnostics
//!
//! Well log files routinely violate their own standards in ways that are
//! recoverable.  Rather than aborting, the parsers attach a `Diagnostic` to
//! whatever they were parsing (attribute, object, object set) and keep going.
//! When the parsed data is finally queried, the accumulated entries are
//! flushed through an `ErrorHandler` supplied by the caller.
//!
//! Two stock handlers are provided.  `LogHandler` forwards entries to the
//! `log` facade at a severity-appropriate level.  `Collector` accumulates
//! entries in memory and is mostly useful in tests.

use log::{info,warn,error};
use crate::STDRESULT;

/// How bad a protocol violation is.
#[derive(Debug,Clone,Copy,PartialEq,Eq,PartialOrd,Ord)]
pub enum Severity {
    /// everything seems fine, but the situation itself is not typical
    Info,
    /// contradicts the specification, recovery is most likely ok
    Minor,
    /// contradicts the specification, not sure if recovery is ok
    Major,
    /// broken beyond repair, could not recover
    Critical
}

impl std::fmt::Display for Severity {
    fn fmt(&self,f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f,"info"),
            Self::Minor => write!(f,"minor"),
            Self::Major => write!(f,"major"),
            Self::Critical => write!(f,"critical")
        }
    }
}

/// A single recorded protocol violation.
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// what was wrong
    pub problem: String,
    /// citation from the governing specification, may be empty
    pub specification: String,
    /// what the parser did about it
    pub action: String
}

impl Diagnostic {
    pub fn new(severity: Severity,problem: &str,specification: &str,action: &str) -> Self {
        Self {
            severity,
            problem: problem.to_string(),
            specification: specification.to_string(),
            action: action.to_string()
        }
    }
}

/// True if no entry in the log is worse than `Severity::Info`
pub fn is_log_clear(log: &[Diagnostic]) -> bool {
    for entry in log {
        if entry.severity >= Severity::Minor {
            return false;
        }
    }
    true
}

/// Sink for diagnostics raised during parsing and queries.
///
/// The core never swallows a handler error; if an implementation returns
/// `Err` the failure propagates to whoever invoked the core operation.
pub trait ErrorHandler {
    fn log(&mut self,severity: Severity,context: &str,problem: &str,
        specification: &str,action: &str,debug: &str) -> STDRESULT;
}

/// Routes every diagnostic through the `log` facade and never fails.
pub struct LogHandler;

impl ErrorHandler for LogHandler {
    fn log(&mut self,severity: Severity,context: &str,problem: &str,
        specification: &str,action: &str,debug: &str) -> STDRESULT {
        let mut msg = format!("{}: {}",context,problem);
        if action.len() > 0 {
            msg += &format!(" ({})",action);
        }
        if debug.len() > 0 {
            msg += &format!(" [{}]",debug);
        }
        match severity {
            Severity::Info => info!("{}",msg),
            Severity::Minor | Severity::Major => warn!("{}",msg),
            Severity::Critical => error!("{}",msg)
        }
        if specification.len() > 0 {
            log::debug!("spec: {}",specification);
        }
        Ok(())
    }
}

/// Accumulates diagnostics in memory, keeping the context of each.
pub struct Collector {
    pub entries: Vec<(String,Diagnostic)>
}

impl Collector {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }
    pub fn count_at_least(&self,severity: Severity) -> usize {
        self.entries.iter().filter(|(_c,d)| d.severity >= severity).count()
    }
}

impl ErrorHandler for Collector {
    fn log(&mut self,severity: Severity,context: &str,problem: &str,
        specification: &str,action: &str,_debug: &str) -> STDRESULT {
        self.entries.push((context.to_string(),
            Diagnostic::new(severity,problem,specification,action)));
        Ok(())
    }
}

/// Flush a parse log through a handler with the given context string.
pub fn flush(log: &[Diagnostic],context: &str,handler: &mut dyn ErrorHandler) -> STDRESULT {
    for entry in log {
        handler.log(entry.severity,context,&entry.problem,&entry.specification,&entry.action,"")?;
    }
    Ok(())
}

#[test]
fn severity_ordering() {
    assert!(Severity::Critical > Severity::Major);
    assert!(Severity::Major > Severity::Minor);
    assert!(Severity::Minor > Severity::Info);
    let log = vec![Diagnostic::new(Severity::Info,"odd but fine","","")];
    assert!(is_log_clear(&log));
    let log = vec![Diagnostic::new(Severity::Minor,"not fine","","")];
    assert!(!is_log_clear(&log));
}
