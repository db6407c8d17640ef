//! Test program builders
//!
//! Every gadget class is serializable, holds a `cmd` string and a `runtime`
//! handle, and forwards `cmd` from `readObject` through a list of wrapper
//! methods into `Runtime.exec`.

use gadgetchain_ir::features::program::domain::{JavaType, MethodRef, VarId};
use gadgetchain_ir::features::program::{ClassBuilder, ClassDecl, MethodBuilder, MethodDecl, Program};

pub const RUNTIME: &str = "java.lang.Runtime";
pub const STRING: &str = "java.lang.String";
pub const OBJECT: &str = "java.lang.Object";
pub const OIS: &str = "java.io.ObjectInputStream";
pub const EXEC: &str = "<java.lang.Runtime: void exec(java.lang.String)>";
pub const SERIALIZABLE: &str = "java.io.Serializable";
pub const HOLDER: &str = "Holder";
pub const EVIL: &str = "Evil";

pub fn read_object_sig(class: &str) -> String {
    format!("<{}: void readObject(java.io.ObjectInputStream)>", class)
}

pub fn exec_ref() -> MethodRef {
    MethodRef::new(RUNTIME, "exec", vec![JavaType::string()], JavaType::void())
}

/// `java.lang.Runtime` with a native `exec(String)`
pub fn runtime_class() -> ClassDecl {
    ClassBuilder::new(RUNTIME)
        .method(MethodBuilder::new("exec").param_type(STRING).native_().build())
        .build()
}

/// One serializable gadget class
pub struct GadgetBuilder {
    name: String,
    wrappers: usize,
    recursive: bool,
    through: Option<String>,
}

impl GadgetBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wrappers: 0,
            recursive: false,
            through: None,
        }
    }

    /// Forward through `n` instance wrappers `w0(String) .. w{n-1}(String)`
    pub fn wrappers(mut self, n: usize) -> Self {
        self.wrappers = n;
        self
    }

    /// The last wrapper calls itself before reaching the sink
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// `readObject` hands `cmd` to the static `forward(String)` of `class`
    /// instead of its own wrappers
    pub fn through(mut self, class: impl Into<String>) -> Self {
        self.through = Some(class.into());
        self
    }

    fn wrapper_ref(&self, k: usize) -> MethodRef {
        MethodRef::new(self.name.as_str(), format!("w{}", k), vec![JavaType::string()], JavaType::void())
    }

    pub fn build(self) -> ClassDecl {
        let name = self.name.as_str();
        let mut class = ClassBuilder::new(name)
            .implements("java.io.Serializable")
            .field("runtime", RUNTIME)
            .field("cmd", STRING);

        let mut read = MethodBuilder::new("readObject");
        let this = read.this_var(name);
        read.param("in", OIS);
        let cmd = read.local("cmd", STRING);
        read.load_field(cmd, this, name, "cmd");
        match (&self.through, self.wrappers) {
            (Some(shared), _) => {
                read.invoke_static(
                    None,
                    MethodRef::new(shared.as_str(), "forward", vec![JavaType::string()], JavaType::void()),
                    &[cmd],
                );
            }
            (None, 0) => {
                let rt = read.local("rt", RUNTIME);
                read.load_field(rt, this, name, "runtime");
                read.invoke_virtual(None, rt, exec_ref(), &[cmd]);
            }
            (None, _) => {
                read.invoke_virtual(None, this, self.wrapper_ref(0), &[cmd]);
            }
        }
        read.ret(None);
        class = class.method(read.build());

        for k in 0..self.wrappers {
            let mut w = MethodBuilder::new(format!("w{}", k));
            let this = w.this_var(name);
            let p = w.param("p", STRING);
            let last = k + 1 == self.wrappers;
            if last && self.recursive {
                w.invoke_virtual(None, this, self.wrapper_ref(k), &[p]);
            }
            if last {
                let rt = w.local("rt", RUNTIME);
                w.load_field(rt, this, name, "runtime");
                w.invoke_virtual(None, rt, exec_ref(), &[p]);
            } else {
                w.invoke_virtual(None, this, self.wrapper_ref(k + 1), &[p]);
            }
            w.ret(None);
            class = class.method(w.build());
        }
        class.build()
    }
}

/// Non-serializable helper with `static void forward(String s)` calling
/// `new Runtime().exec(s)`-style through a static runtime field
pub fn shared_forwarder(name: &str) -> ClassDecl {
    let mut forward = MethodBuilder::new("forward").static_();
    let s = forward.param("s", STRING);
    let rt = forward.local("rt", RUNTIME);
    forward.load_static(rt, name, "RUNTIME");
    forward.invoke_virtual(None, rt, exec_ref(), &[s]);
    forward.ret(None);
    ClassBuilder::new(name)
        .static_field("RUNTIME", RUNTIME)
        .method(forward.build())
        .build()
}

/// Gadget whose `readObject` passes `this.cmd` (a String) on as an `Object`
/// and the next hop casts it to `Integer` before it reaches the sink
pub fn mistyped_gadget(name: &str) -> ClassDecl {
    let mut read = MethodBuilder::new("readObject");
    let this = read.this_var(name);
    read.param("in", OIS);
    let cmd = read.local("cmd", STRING);
    read.load_field(cmd, this, name, "cmd");
    read.invoke_virtual(
        None,
        this,
        MethodRef::new(name, "widen", vec![JavaType::object()], JavaType::void()),
        &[cmd],
    );
    read.ret(None);

    let mut widen = MethodBuilder::new("widen");
    let this = widen.this_var(name);
    let o = widen.param("o", OBJECT);
    let n = widen.local("n", "java.lang.Integer");
    widen.cast(n, o, "java.lang.Integer");
    widen.invoke_virtual(
        None,
        this,
        MethodRef::new(name, "narrow", vec![JavaType::from("java.lang.Integer")], JavaType::void()),
        &[n],
    );
    widen.ret(None);

    let mut narrow = MethodBuilder::new("narrow");
    let this = narrow.this_var(name);
    let i = narrow.param("i", "java.lang.Integer");
    let rt = narrow.local("rt", RUNTIME);
    narrow.load_field(rt, this, name, "runtime");
    narrow.invoke_virtual(
        None,
        rt,
        MethodRef::new(RUNTIME, "exec", vec![JavaType::object()], JavaType::void()),
        &[i],
    );
    narrow.ret(None);

    ClassBuilder::new(name)
        .implements("java.io.Serializable")
        .field("runtime", RUNTIME)
        .field("cmd", STRING)
        .method(read.build())
        .method(widen.build())
        .method(narrow.build())
        .build()
}

/// `Runtime` with both `exec(String)` and `exec(Object)`
pub fn runtime_class_with_object_exec() -> ClassDecl {
    ClassBuilder::new(RUNTIME)
        .method(MethodBuilder::new("exec").param_type(STRING).native_().build())
        .method(MethodBuilder::new("exec").param_type(OBJECT).native_().build())
        .build()
}

// ============================================================================
// Reflective entry points
// ============================================================================

/// Serializable `Holder` declaring `fields`; `body` writes the statements of
/// its `readObject` given the builder and `this`
pub fn holder(fields: &[(&str, &str)], body: impl FnOnce(&mut MethodBuilder, VarId)) -> ClassDecl {
    let mut read = MethodBuilder::new("readObject");
    let this = read.this_var(HOLDER);
    read.param("in", OIS);
    body(&mut read, this);
    read.ret(None);
    fields
        .iter()
        .fold(ClassBuilder::new(HOLDER).implements(SERIALIZABLE), |c, &(name, ty)| c.field(name, ty))
        .method(read.build())
        .build()
}

/// `rt = this.runtime; rt.exec(cmd)` in a method of `class`
pub fn exec_with_own_runtime(m: &mut MethodBuilder, this: VarId, class: &str, cmd: VarId) {
    let rt = m.local("rt", RUNTIME);
    m.load_field(rt, this, class, "runtime");
    m.invoke_virtual(None, rt, exec_ref(), &[cmd]);
}

/// Instance method of `class` running `exec(this.cmd)`; `returns` picks
/// the return type, a non-void method hands `cmd` back
pub fn exec_own_cmd(class: &str, name: &str, returns: Option<&str>) -> MethodDecl {
    let mut m = MethodBuilder::new(name);
    if let Some(ty) = returns {
        m = m.returns(ty);
    }
    let this = m.this_var(class);
    let cmd = m.local("cmd", STRING);
    m.load_field(cmd, this, class, "cmd");
    exec_with_own_runtime(&mut m, this, class, cmd);
    m.ret(returns.map(|_| cmd));
    m.build()
}

/// Serializable `class` with `runtime` and `cmd` fields, implementing
/// `interfaces` as well
pub fn payload_class(class: &str, interfaces: &[&str], methods: Vec<MethodDecl>) -> ClassDecl {
    let decl = interfaces
        .iter()
        .fold(ClassBuilder::new(class).implements(SERIALIZABLE), |c, &i| c.implements(i))
        .field("runtime", RUNTIME)
        .field("cmd", STRING);
    methods.into_iter().fold(decl, ClassBuilder::method).build()
}

/// Class holding one static native method
pub fn native_helper(class: &str, name: &str, params: &[&str], returns: &str) -> ClassDecl {
    let method = params
        .iter()
        .fold(MethodBuilder::new(name), |m, &p| m.param_type(p))
        .returns(returns)
        .static_()
        .native_()
        .build();
    ClassBuilder::new(class).method(method).build()
}

pub fn program(classes: Vec<ClassDecl>) -> Program {
    Program::new(classes).expect("fixture program is well-formed")
}

/// Runtime plus `n` gadgets with `depth` wrappers each
pub fn gadget_farm(n: usize, depth: usize) -> Program {
    let mut classes = vec![runtime_class()];
    classes.extend((0..n).map(|i| GadgetBuilder::new(format!("farm.Gadget{}", i)).wrappers(depth).build()));
    program(classes)
}
