//! Pixmove WASM - WebAssembly bindings for Pixmove
//!
//! This crate exposes the pixmove-core transform session to
//! JavaScript/TypeScript hosts.
//!
//! # Module Structure
//!
//! - `session` - `JsTransformSession`, one move/scale/rotate/flip of a selection
//! - `types` - RGBA image wrapper and handle/cursor codes
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsImage, JsTransformSession } from '@pixmove/wasm';
//!
//! await init();
//!
//! const canvas = new JsImage(width, height, rgbaBytes);
//! const session = new JsTransformSession(canvas, 8, 8, 16, 16, true);
//!
//! const handle = session.handle_at(px, py);
//! session.catch(px, py, handle);
//! session.moveTo(px + 10, py, 0);
//! draw(session.render());
//! session.drop_image();
//! ```

use wasm_bindgen::prelude::*;

mod session;
mod types;

pub use session::JsTransformSession;
pub use types::JsImage;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }
}
