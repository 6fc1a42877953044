//! One-time GL function pointer loading.

use std::sync::Once;

static GL_INIT_ONCE: Once = Once::new();

/// Load GL function pointers for the current context.
///
/// Pointers are loaded exactly once per process via `gl_loader`; later calls
/// return immediately.
pub fn load_gl() {
    GL_INIT_ONCE.call_once(|| {
        gl_loader::init_gl();
        gl::load_with(|s| gl_loader::get_proc_address(s).cast());
        tracing::debug!("GL function pointers loaded");
    });
}

/// Whether a GL context is current on this thread.
pub fn is_context_current() -> bool {
    gl::GetString::is_loaded() && unsafe { !gl::GetString(gl::VERSION).is_null() }
}
