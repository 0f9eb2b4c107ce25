//! Foreign call interface
//!
//! The bridge never talks to the engine directly. Every class lookup,
//! constructor, method call, field read and reference release goes through
//! [`ForeignEnv`], which is implemented by the JVM backend (`jvm` feature)
//! and by the in-process fake used in tests.
//!
//! Identifiers handed out by an environment are plain tokens. They are only
//! meaningful to the environment that produced them.

use thiserror::Error;

/// A class resolved in the foreign runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

/// An instance method or constructor resolved in the foreign runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub u32);

/// A static method resolved in the foreign runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticMethodId(pub u32);

/// An instance field resolved in the foreign runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(pub u32);

/// A local reference to an object living in the foreign runtime.
///
/// Every `ObjectId` returned by an environment must be passed to
/// [`ForeignEnv::delete_local_ref`] exactly once. Use
/// [`crate::handle::LocalRef`] rather than holding these directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u64);

/// Argument passed across the boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg {
    Int(i32),
    Long(i64),
    Double(f64),
    Object(ObjectId),
}

/// Expected return kind of a foreign call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Void,
    Boolean,
    Int,
    Double,
    Object,
}

/// Value returned by a foreign call or field read
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Void,
    Boolean(bool),
    Int(i32),
    Double(f64),
    Object(ObjectId),
    Null,
}

impl Value {
    pub fn into_bool(self) -> Result<bool, ForeignError> {
        match self {
            Value::Boolean(b) => Ok(b),
            other => Err(ForeignError::unexpected(ReturnKind::Boolean, other)),
        }
    }

    pub fn into_i32(self) -> Result<i32, ForeignError> {
        match self {
            Value::Int(i) => Ok(i),
            other => Err(ForeignError::unexpected(ReturnKind::Int, other)),
        }
    }

    pub fn into_f64(self) -> Result<f64, ForeignError> {
        match self {
            Value::Double(d) => Ok(d),
            other => Err(ForeignError::unexpected(ReturnKind::Double, other)),
        }
    }

    /// Unwrap an object reference. A null reference is an error: the bridge
    /// never asks for an object it can do without.
    pub fn into_object(self) -> Result<ObjectId, ForeignError> {
        match self {
            Value::Object(id) => Ok(id),
            Value::Null => Err(ForeignError::NullObject),
            other => Err(ForeignError::unexpected(ReturnKind::Object, other)),
        }
    }
}

/// Failure of a single foreign call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForeignError {
    /// The callee raised (a pending exception in JNI terms). The exception
    /// has already been cleared by the environment.
    #[error("foreign call `{call}` raised: {message}")]
    Raised { call: String, message: String },
    #[error("foreign call returned null where an object was required")]
    NullObject,
    #[error("foreign call returned {actual:?}, expected {expected:?}")]
    UnexpectedValue { expected: ReturnKind, actual: Value },
    #[error("{0} has no vector components")]
    NoComponents(&'static str),
    #[error("unknown foreign reference {0:?}")]
    UnknownReference(ObjectId),
}

impl ForeignError {
    fn unexpected(expected: ReturnKind, actual: Value) -> Self {
        ForeignError::UnexpectedValue { expected, actual }
    }

    pub fn raised(call: impl Into<String>, message: impl Into<String>) -> Self {
        ForeignError::Raised {
            call: call.into(),
            message: message.into(),
        }
    }
}

/// The operations the bridge issues against the foreign runtime.
///
/// Lookups return `None` when the symbol does not exist; calls return
/// `Err` when the callee raised. Implementations are single-threaded and
/// take `&self` so that guards can share the environment.
pub trait ForeignEnv {
    fn find_class(&self, name: &str) -> Option<ClassId>;

    fn method_id(&self, class: ClassId, name: &str, signature: &str) -> Option<MethodId>;

    fn static_method_id(
        &self,
        class: ClassId,
        name: &str,
        signature: &str,
    ) -> Option<StaticMethodId>;

    fn field_id(&self, class: ClassId, name: &str, signature: &str) -> Option<FieldId>;

    /// Construct an object. The returned reference is owned by the caller.
    fn new_object(
        &self,
        class: ClassId,
        constructor: MethodId,
        args: &[Arg],
    ) -> Result<ObjectId, ForeignError>;

    /// Call an instance method. Object results are new local references
    /// owned by the caller.
    fn call_method(
        &self,
        target: ObjectId,
        method: MethodId,
        ret: ReturnKind,
        args: &[Arg],
    ) -> Result<Value, ForeignError>;

    fn call_static_method(
        &self,
        class: ClassId,
        method: StaticMethodId,
        ret: ReturnKind,
        args: &[Arg],
    ) -> Result<Value, ForeignError>;

    fn get_field(
        &self,
        target: ObjectId,
        field: FieldId,
        ret: ReturnKind,
    ) -> Result<Value, ForeignError>;

    /// Copy the contents of a foreign string object.
    fn read_string(&self, string: ObjectId) -> Result<String, ForeignError>;

    /// Release a local reference. Releasing an unknown reference is a no-op
    /// for the runtime but a bookkeeping bug for the caller.
    fn delete_local_ref(&self, object: ObjectId);
}

impl<T: ForeignEnv + ?Sized> ForeignEnv for &T {
    fn find_class(&self, name: &str) -> Option<ClassId> {
        (**self).find_class(name)
    }

    fn method_id(&self, class: ClassId, name: &str, signature: &str) -> Option<MethodId> {
        (**self).method_id(class, name, signature)
    }

    fn static_method_id(
        &self,
        class: ClassId,
        name: &str,
        signature: &str,
    ) -> Option<StaticMethodId> {
        (**self).static_method_id(class, name, signature)
    }

    fn field_id(&self, class: ClassId, name: &str, signature: &str) -> Option<FieldId> {
        (**self).field_id(class, name, signature)
    }

    fn new_object(
        &self,
        class: ClassId,
        constructor: MethodId,
        args: &[Arg],
    ) -> Result<ObjectId, ForeignError> {
        (**self).new_object(class, constructor, args)
    }

    fn call_method(
        &self,
        target: ObjectId,
        method: MethodId,
        ret: ReturnKind,
        args: &[Arg],
    ) -> Result<Value, ForeignError> {
        (**self).call_method(target, method, ret, args)
    }

    fn call_static_method(
        &self,
        class: ClassId,
        method: StaticMethodId,
        ret: ReturnKind,
        args: &[Arg],
    ) -> Result<Value, ForeignError> {
        (**self).call_static_method(class, method, ret, args)
    }

    fn get_field(
        &self,
        target: ObjectId,
        field: FieldId,
        ret: ReturnKind,
    ) -> Result<Value, ForeignError> {
        (**self).get_field(target, field, ret)
    }

    fn read_string(&self, string: ObjectId) -> Result<String, ForeignError> {
        (**self).read_string(string)
    }

    fn delete_local_ref(&self, object: ObjectId) {
        (**self).delete_local_ref(object)
    }
}
