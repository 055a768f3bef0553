//! Managed objects: a declared syntax plus get/set accessors.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ErrorStatus;
use crate::value::Value;

/// Declared SMI type of a managed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
    Integer,
    OctetString,
    ObjectIdentifier,
    IpAddress,
    Counter32,
    Gauge32,
    TimeTicks,
    Opaque,
    Counter64,
}

impl Syntax {
    /// Whether `value` is of this syntax.
    ///
    /// ```
    /// use snmp_mib_agent::{Syntax, Value};
    ///
    /// assert!(Syntax::Integer.matches(&Value::Integer(3)));
    /// assert!(!Syntax::Integer.matches(&Value::Gauge32(3)));
    /// ```
    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Syntax::Integer, Value::Integer(_))
                | (Syntax::OctetString, Value::OctetString(_))
                | (Syntax::ObjectIdentifier, Value::ObjectIdentifier(_))
                | (Syntax::IpAddress, Value::IpAddress(_))
                | (Syntax::Counter32, Value::Counter32(_))
                | (Syntax::Gauge32, Value::Gauge32(_))
                | (Syntax::TimeTicks, Value::TimeTicks(_))
                | (Syntax::Opaque, Value::Opaque(_))
                | (Syntax::Counter64, Value::Counter64(_))
        )
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Syntax::Integer => "INTEGER",
            Syntax::OctetString => "OCTET STRING",
            Syntax::ObjectIdentifier => "OBJECT IDENTIFIER",
            Syntax::IpAddress => "IpAddress",
            Syntax::Counter32 => "Counter32",
            Syntax::Gauge32 => "Gauge32",
            Syntax::TimeTicks => "TimeTicks",
            Syntax::Opaque => "Opaque",
            Syntax::Counter64 => "Counter64",
        };
        f.write_str(name)
    }
}

/// Outcome of a SET test or commit on one binding.
///
/// The variants map to RFC 3416 error status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetResult {
    Ok,
    /// Access denied for the requesting community.
    NoAccess,
    /// The object has no set accessor.
    NotWritable,
    /// Value has the wrong ASN.1 type for the object.
    WrongType,
    WrongLength,
    WrongEncoding,
    /// Value is outside the object's permitted range.
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    InconsistentName,
}

impl SetResult {
    /// Check if this result indicates success.
    pub fn is_ok(&self) -> bool {
        matches!(self, SetResult::Ok)
    }

    /// Convert to an ErrorStatus code.
    pub fn to_error_status(&self) -> ErrorStatus {
        match self {
            SetResult::Ok => ErrorStatus::NoError,
            SetResult::NoAccess => ErrorStatus::NoAccess,
            SetResult::NotWritable => ErrorStatus::NotWritable,
            SetResult::WrongType => ErrorStatus::WrongType,
            SetResult::WrongLength => ErrorStatus::WrongLength,
            SetResult::WrongEncoding => ErrorStatus::WrongEncoding,
            SetResult::WrongValue => ErrorStatus::WrongValue,
            SetResult::NoCreation => ErrorStatus::NoCreation,
            SetResult::InconsistentValue => ErrorStatus::InconsistentValue,
            SetResult::ResourceUnavailable => ErrorStatus::ResourceUnavailable,
            SetResult::CommitFailed => ErrorStatus::CommitFailed,
            SetResult::UndoFailed => ErrorStatus::UndoFailed,
            SetResult::InconsistentName => ErrorStatus::InconsistentName,
        }
    }
}

type Getter = Arc<dyn Fn() -> Value + Send + Sync>;
type Setter = Arc<dyn Fn(Value) -> Result<(), SetResult> + Send + Sync>;
type Validator = Arc<dyn Fn(&Value) -> SetResult + Send + Sync>;

/// A scalar registered in the MIB tree.
///
/// Accessors are plain closures. An object without a setter is read-only.
/// The accessors are only ever invoked by [`MibTree`](super::MibTree) while
/// it holds its guard, so they need no synchronization of their own beyond
/// being `Send + Sync`.
#[derive(Clone)]
pub struct ManagedObject {
    syntax: Syntax,
    getter: Getter,
    setter: Option<Setter>,
    validator: Option<Validator>,
}

impl ManagedObject {
    /// Read-only object backed by `get`.
    ///
    /// ```
    /// use snmp_mib_agent::{ManagedObject, Syntax, Value};
    ///
    /// let descr = ManagedObject::read_only(Syntax::OctetString, || Value::from("router"));
    /// assert!(!descr.is_writable());
    /// ```
    pub fn read_only<G>(syntax: Syntax, get: G) -> Self
    where
        G: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            syntax,
            getter: Arc::new(get),
            setter: None,
            validator: None,
        }
    }

    /// Read-write object backed by a getter and a setter.
    pub fn read_write<G, S>(syntax: Syntax, get: G, set: S) -> Self
    where
        G: Fn() -> Value + Send + Sync + 'static,
        S: Fn(Value) -> Result<(), SetResult> + Send + Sync + 'static,
    {
        Self {
            syntax,
            getter: Arc::new(get),
            setter: Some(Arc::new(set)),
            validator: None,
        }
    }

    /// Read-write object holding its own value, starting at `initial`.
    pub fn variable(syntax: Syntax, initial: Value) -> Self {
        let cell = Arc::new(Mutex::new(initial));
        let read = Arc::clone(&cell);
        Self::read_write(
            syntax,
            move || read.lock().clone(),
            move |value| {
                *cell.lock() = value;
                Ok(())
            },
        )
    }

    /// Attach a check run during the SET test phase, after the syntax check.
    ///
    /// Anything other than [`SetResult::Ok`] rejects the whole SET.
    pub fn with_validator<F>(mut self, validate: F) -> Self
    where
        F: Fn(&Value) -> SetResult + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validate));
        self
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// SET test phase for a single binding.
    pub fn test(&self, value: &Value) -> SetResult {
        if self.setter.is_none() {
            return SetResult::NotWritable;
        }
        if !self.syntax.matches(value) {
            return SetResult::WrongType;
        }
        match &self.validator {
            Some(validate) => validate(value),
            None => SetResult::Ok,
        }
    }

    pub(crate) fn get(&self) -> Value {
        (self.getter)()
    }

    pub(crate) fn set(&self, value: Value) -> Result<(), SetResult> {
        match &self.setter {
            Some(set) => set(value),
            None => Err(SetResult::NotWritable),
        }
    }
}

impl fmt::Debug for ManagedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedObject")
            .field("syntax", &self.syntax)
            .field("writable", &self.is_writable())
            .field("validated", &self.validator.is_some())
            .finish()
    }
}
