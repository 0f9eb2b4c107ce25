//! JVM backend built on the `jni` invocation API
//!
//! Classes are pinned with global references for the lifetime of the
//! environment. Every object handed to the bridge is a local reference kept
//! in a slab keyed by [`ObjectId`] until the bridge deletes it.

use crate::config::RuntimeConfig;
use crate::foreign::{
    Arg, ClassId, FieldId, ForeignEnv, ForeignError, MethodId, ObjectId, ReturnKind,
    StaticMethodId, Value,
};
use crate::runtime::{ForeignRuntime, RuntimeInitError};
use jni::objects::{
    GlobalRef, JClass, JFieldID, JMethodID, JObject, JStaticMethodID, JString, JValue, JValueOwned,
};
use jni::signature::{Primitive, ReturnType};
use jni::sys::jvalue;
use jni::{AttachGuard, InitArgs, InitArgsBuilder, JNIEnv, JNIVersion, JavaVM};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A JVM started in-process
pub struct JvmRuntime {
    vm: JavaVM,
}

impl JvmRuntime {
    pub fn create(config: &RuntimeConfig) -> Result<Self, RuntimeInitError> {
        let options = config.jvm_options();
        let args = init_args(&options)?;
        let vm = JavaVM::new(args).map_err(|e| RuntimeInitError::Create(e.to_string()))?;
        info!(class_path = %config.class_path, "java vm created");
        Ok(Self { vm })
    }
}

fn init_args(options: &[String]) -> Result<InitArgs, RuntimeInitError> {
    let mut builder = InitArgsBuilder::new().version(JNIVersion::V8);
    for option in options {
        debug!(%option, "jvm option");
        builder = builder.option(option.as_str());
    }
    builder.build().map_err(|e| RuntimeInitError::InvalidOptions {
        option: options.join(" "),
        reason: e.to_string(),
    })
}

impl ForeignRuntime for JvmRuntime {
    type Env<'rt> = JvmEnv<'rt>;

    fn attach(&self) -> Result<JvmEnv<'_>, RuntimeInitError> {
        let guard = self
            .vm
            .attach_current_thread()
            .map_err(|e| RuntimeInitError::Attach(e.to_string()))?;
        Ok(JvmEnv::new(guard))
    }

    fn destroy(self) {
        // SAFETY: `destroy` consumes the runtime, and every `JvmEnv` borrows
        // it, so no attach guard or JNI reference outlives this call.
        if let Err(e) = unsafe { self.vm.destroy() } {
            warn!(error = %e, "java vm did not shut down cleanly");
        } else {
            info!("java vm destroyed");
        }
    }
}

/// The attached thread's JNI environment
pub struct JvmEnv<'vm> {
    env: RefCell<AttachGuard<'vm>>,
    classes: RefCell<Vec<GlobalRef>>,
    methods: RefCell<Vec<JMethodID>>,
    static_methods: RefCell<Vec<JStaticMethodID>>,
    fields: RefCell<Vec<JFieldID>>,
    objects: RefCell<HashMap<u64, JObject<'vm>>>,
    next_object: Cell<u64>,
}

impl<'vm> JvmEnv<'vm> {
    fn new(guard: AttachGuard<'vm>) -> Self {
        Self {
            env: RefCell::new(guard),
            classes: RefCell::new(Vec::new()),
            methods: RefCell::new(Vec::new()),
            static_methods: RefCell::new(Vec::new()),
            fields: RefCell::new(Vec::new()),
            objects: RefCell::new(HashMap::new()),
            next_object: Cell::new(0),
        }
    }

    fn store(&self, object: JObject<'vm>) -> Value {
        if object.is_null() {
            return Value::Null;
        }
        let id = self.next_object.get() + 1;
        self.next_object.set(id);
        self.objects.borrow_mut().insert(id, object);
        Value::Object(ObjectId(id))
    }

    fn class(&self, class: ClassId) -> Result<GlobalRef, ForeignError> {
        self.classes
            .borrow()
            .get(class.0 as usize)
            .cloned()
            .ok_or_else(|| ForeignError::raised("class", format!("unknown class id {}", class.0)))
    }

    fn lookup_class(env: &mut JNIEnv<'vm>, name: &str) -> Option<GlobalRef> {
        let local = match env.find_class(name) {
            Ok(class) => class,
            Err(_) => {
                clear_exception(env);
                return None;
            }
        };
        let global = env.new_global_ref(&local).ok();
        // A failed delete only leaks one local slot for the thread's lifetime.
        let _ = env.delete_local_ref(local);
        global
    }

    /// Convert bridge arguments, resolving object handles through the slab.
    fn jvalues(&self, args: &[Arg]) -> Result<Vec<jvalue>, ForeignError> {
        let objects = self.objects.borrow();
        args.iter()
            .map(|arg| {
                Ok(match *arg {
                    Arg::Int(i) => JValue::Int(i).as_jni(),
                    Arg::Long(l) => JValue::Long(l).as_jni(),
                    Arg::Double(d) => JValue::Double(d).as_jni(),
                    Arg::Object(id) => {
                        let object = objects
                            .get(&id.0)
                            .ok_or(ForeignError::UnknownReference(id))?;
                        JValue::Object(object).as_jni()
                    }
                })
            })
            .collect()
    }

    fn convert(&self, value: JValueOwned<'vm>, ret: ReturnKind) -> Result<Value, ForeignError> {
        let mismatch = |e: jni::errors::Error| ForeignError::raised("convert", e.to_string());
        Ok(match ret {
            ReturnKind::Void => Value::Void,
            ReturnKind::Boolean => Value::Boolean(value.z().map_err(mismatch)?),
            ReturnKind::Int => Value::Int(value.i().map_err(mismatch)?),
            ReturnKind::Double => Value::Double(value.d().map_err(mismatch)?),
            ReturnKind::Object => self.store(value.l().map_err(mismatch)?),
        })
    }

    fn raised(env: &mut JNIEnv<'vm>, call: &str, error: jni::errors::Error) -> ForeignError {
        let message = take_exception(env).unwrap_or_else(|| error.to_string());
        ForeignError::raised(call, message.replace('\n', " "))
    }
}

/// Clear a pending exception and return its `toString()`.
fn take_exception(env: &mut JNIEnv<'_>) -> Option<String> {
    if !env.exception_check().unwrap_or(false) {
        return None;
    }
    let throwable = env.exception_occurred().ok();
    let _ = env.exception_clear();
    let throwable = throwable.filter(|t| !t.is_null())?;
    let text = env
        .call_method(&throwable, "toString", "()Ljava/lang/String;", &[])
        .and_then(|v| v.l())
        .ok()
        .and_then(|s| {
            let jstr = JString::from(s);
            let text = env.get_string(&jstr).map(String::from).ok();
            let _ = env.delete_local_ref(jstr);
            text
        });
    let _ = env.exception_clear();
    let _ = env.delete_local_ref(throwable);
    text
}

/// Clear the exception raised by a failed lookup. A miss is reported by
/// the caller as a resolution error, so the exception is only logged.
fn clear_exception(env: &mut JNIEnv<'_>) {
    if let Some(text) = take_exception(env) {
        debug!(exception = %text, "lookup raised");
    }
}

fn return_type(ret: ReturnKind) -> ReturnType {
    match ret {
        ReturnKind::Void => ReturnType::Primitive(Primitive::Void),
        ReturnKind::Boolean => ReturnType::Primitive(Primitive::Boolean),
        ReturnKind::Int => ReturnType::Primitive(Primitive::Int),
        ReturnKind::Double => ReturnType::Primitive(Primitive::Double),
        ReturnKind::Object => ReturnType::Object,
    }
}

impl<'vm> ForeignEnv for JvmEnv<'vm> {
    fn find_class(&self, name: &str) -> Option<ClassId> {
        let mut env = self.env.borrow_mut();
        let global = Self::lookup_class(&mut env, name)?;
        let mut classes = self.classes.borrow_mut();
        classes.push(global);
        Some(ClassId(classes.len() as u32 - 1))
    }

    fn method_id(&self, class: ClassId, name: &str, signature: &str) -> Option<MethodId> {
        let class = self.class(class).ok()?;
        let mut env = self.env.borrow_mut();
        let class: &JClass = class.as_obj().into();
        match env.get_method_id(class, name, signature) {
            Ok(id) => {
                let mut methods = self.methods.borrow_mut();
                methods.push(id);
                Some(MethodId(methods.len() as u32 - 1))
            }
            Err(_) => {
                clear_exception(&mut env);
                None
            }
        }
    }

    fn static_method_id(
        &self,
        class: ClassId,
        name: &str,
        signature: &str,
    ) -> Option<StaticMethodId> {
        let class = self.class(class).ok()?;
        let mut env = self.env.borrow_mut();
        let class: &JClass = class.as_obj().into();
        match env.get_static_method_id(class, name, signature) {
            Ok(id) => {
                let mut methods = self.static_methods.borrow_mut();
                methods.push(id);
                Some(StaticMethodId(methods.len() as u32 - 1))
            }
            Err(_) => {
                clear_exception(&mut env);
                None
            }
        }
    }

    fn field_id(&self, class: ClassId, name: &str, signature: &str) -> Option<FieldId> {
        let class = self.class(class).ok()?;
        let mut env = self.env.borrow_mut();
        let class: &JClass = class.as_obj().into();
        match env.get_field_id(class, name, signature) {
            Ok(id) => {
                let mut fields = self.fields.borrow_mut();
                fields.push(id);
                Some(FieldId(fields.len() as u32 - 1))
            }
            Err(_) => {
                clear_exception(&mut env);
                None
            }
        }
    }

    fn new_object(
        &self,
        class: ClassId,
        constructor: MethodId,
        args: &[Arg],
    ) -> Result<ObjectId, ForeignError> {
        let class = self.class(class)?;
        let ctor = method(&self.methods, constructor.0)?;
        let args = self.jvalues(args)?;
        let mut env = self.env.borrow_mut();
        let class: &JClass = class.as_obj().into();
        // SAFETY: `ctor` was resolved on this class with the signature the
        // arguments were built for.
        let object = unsafe { env.new_object_unchecked(class, ctor, &args) }
            .map_err(|e| Self::raised(&mut env, "<init>", e))?;
        drop(env);
        self.store(object).into_object()
    }

    fn call_method(
        &self,
        target: ObjectId,
        method_id: MethodId,
        ret: ReturnKind,
        args: &[Arg],
    ) -> Result<Value, ForeignError> {
        let id = method(&self.methods, method_id.0)?;
        let args = self.jvalues(args)?;
        let value = {
            let objects = self.objects.borrow();
            let target = objects
                .get(&target.0)
                .ok_or(ForeignError::UnknownReference(target))?;
            let mut env = self.env.borrow_mut();
            // SAFETY: `id` was resolved with a signature whose return type
            // matches `ret` and whose parameters match `args`.
            unsafe { env.call_method_unchecked(target, id, return_type(ret), &args) }
                .map_err(|e| Self::raised(&mut env, "method", e))?
        };
        self.convert(value, ret)
    }

    fn call_static_method(
        &self,
        class: ClassId,
        method_id: StaticMethodId,
        ret: ReturnKind,
        args: &[Arg],
    ) -> Result<Value, ForeignError> {
        let class = self.class(class)?;
        let id = self
            .static_methods
            .borrow()
            .get(method_id.0 as usize)
            .copied()
            .ok_or_else(|| ForeignError::raised("static method", "unknown id"))?;
        let args = self.jvalues(args)?;
        let value = {
            let mut env = self.env.borrow_mut();
            let class: &JClass = class.as_obj().into();
            // SAFETY: as for `call_method`.
            unsafe { env.call_static_method_unchecked(class, id, return_type(ret), &args) }
                .map_err(|e| Self::raised(&mut env, "static method", e))?
        };
        self.convert(value, ret)
    }

    fn get_field(
        &self,
        target: ObjectId,
        field: FieldId,
        ret: ReturnKind,
    ) -> Result<Value, ForeignError> {
        let id = self
            .fields
            .borrow()
            .get(field.0 as usize)
            .copied()
            .ok_or_else(|| ForeignError::raised("field", "unknown id"))?;
        let value = {
            let objects = self.objects.borrow();
            let target = objects
                .get(&target.0)
                .ok_or(ForeignError::UnknownReference(target))?;
            let mut env = self.env.borrow_mut();
            env.get_field_unchecked(target, id, return_type(ret))
                .map_err(|e| Self::raised(&mut env, "field", e))?
        };
        self.convert(value, ret)
    }

    fn read_string(&self, string: ObjectId) -> Result<String, ForeignError> {
        let objects = self.objects.borrow();
        let object = objects
            .get(&string.0)
            .ok_or(ForeignError::UnknownReference(string))?;
        let string: &JString = object.into();
        let mut env = self.env.borrow_mut();
        let text = env.get_string(string).map(String::from);
        text.map_err(|e| Self::raised(&mut env, "read_string", e))
    }

    fn delete_local_ref(&self, object: ObjectId) {
        let Some(local) = self.objects.borrow_mut().remove(&object.0) else {
            warn!(handle = object.0, "release of unknown reference");
            return;
        };
        if let Err(e) = self.env.borrow_mut().delete_local_ref(local) {
            warn!(handle = object.0, error = %e, "cannot delete local reference");
        }
    }
}

fn method(methods: &RefCell<Vec<JMethodID>>, index: u32) -> Result<JMethodID, ForeignError> {
    methods
        .borrow()
        .get(index as usize)
        .copied()
        .ok_or_else(|| ForeignError::raised("method", format!("unknown method id {index}")))
}
