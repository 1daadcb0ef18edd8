//! Process-wide embedded CPython lifecycle. The interpreter comes up exactly
//! once, `libpython` is promoted into the global symbol namespace so native
//! extension modules imported later can resolve its symbols, and the GIL is
//! left released so any thread can acquire it afterwards.

use std::sync::Mutex;

use pyo3::prelude::*;
use tabflow_core::{Error, Result};
use tracing::{debug, error, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Uninitialized,
    Running,
    Finalized,
}

static STATE: Mutex<State> = Mutex::new(State::Uninitialized);

/// Start the interpreter. Idempotent; a second call performs no interpreter
/// side effects. Failure to resolve `libpython` is fatal to backend load.
pub fn initialize() -> Result<()> {
    let mut state = STATE.lock().unwrap_or_else(|p| p.into_inner());
    if *state != State::Uninitialized {
        return Ok(());
    }

    // prepare_freethreaded_python releases the calling thread's hold on the
    // GIL once the runtime is up, so later threads can acquire it.
    pyo3::prepare_freethreaded_python();
    promote_libpython()?;

    *state = State::Running;
    info!("python interpreter initialized");
    Ok(())
}

/// Tear the interpreter down exactly once. Calling before `initialize`, or
/// twice, is a no-op. No Python object may be touched afterwards.
pub fn finalize() -> Result<()> {
    let mut state = STATE.lock().unwrap_or_else(|p| p.into_inner());
    if *state != State::Running {
        return Ok(());
    }

    unsafe {
        pyo3::ffi::PyGILState_Ensure();
        if pyo3::ffi::Py_FinalizeEx() < 0 {
            error!("python interpreter teardown reported an error");
        }
    }

    *state = State::Finalized;
    info!("python interpreter finalized");
    Ok(())
}

pub fn is_running() -> bool {
    *STATE.lock().unwrap_or_else(|p| p.into_inner()) == State::Running
}

/// Re-open `libpython` with `RTLD_GLOBAL` so C-extension modules loaded by
/// the interpreter can resolve its symbols. A statically linked interpreter
/// has nothing to promote.
#[cfg(unix)]
fn promote_libpython() -> Result<()> {
    use libloading::os::unix::{Library, RTLD_GLOBAL, RTLD_LAZY};

    let candidates = Python::with_gil(|py| -> PyResult<Vec<String>> {
        let version = py.version_info();
        let mut names = Vec::new();

        // prefer the soname the interpreter was actually built as
        let sysconfig = pyo3::types::PyModule::import(py, "sysconfig")?;
        if let Ok(ldlib) = sysconfig
            .call_method1("get_config_var", ("LDLIBRARY",))?
            .extract::<String>()
        {
            if ldlib.ends_with(".a") {
                debug!(library = %ldlib, "statically linked interpreter; nothing to promote");
                return Ok(names);
            }
            if !ldlib.is_empty() {
                names.push(ldlib);
            }
        }
        names.push(format!("libpython{}.{}.so", version.major, version.minor));
        names.push(format!("libpython{}.{}.so.1.0", version.major, version.minor));
        Ok(names)
    })
    .map_err(|e| Error::Init(format!("failed to identify libpython: {e}")))?;

    if candidates.is_empty() {
        return Ok(());
    }

    let mut failures = Vec::new();
    for name in &candidates {
        match unsafe { Library::open(Some(name.as_str()), RTLD_LAZY | RTLD_GLOBAL) } {
            Ok(lib) => {
                debug!(library = %name, "promoted libpython into the global namespace");
                // keep the handle for the life of the process
                std::mem::forget(lib);
                return Ok(());
            }
            Err(e) => failures.push(format!("{name}: {e}")),
        }
    }
    Err(Error::Init(format!(
        "failed to open libpython with RTLD_GLOBAL ({})",
        failures.join("; ")
    )))
}

#[cfg(not(unix))]
fn promote_libpython() -> Result<()> {
    Ok(())
}
