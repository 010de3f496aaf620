// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Site-Progress WebAssembly Bindings
//!
//! Browser API for the progress panel built with wasm-bindgen. The panel
//! creates one `ProgressSession` per open viewer and passes it the host
//! viewer object; see [`viewer`] for the methods that object must provide.
//!
//! ```javascript
//! import init, { ProgressSession } from 'site-progress-wasm';
//!
//! await init();
//! const session = new ProgressSession(host, { engine: { batchSize: 2000 } });
//! const report = await session.applyStatusColoring(installations, preassemblies);
//! session.startWatching({ onSelection: (objects) => showDetails(objects) });
//! ```

use wasm_bindgen::prelude::*;

mod guid;
mod session;
mod utils;
pub mod viewer;

pub use guid::{classify_guid, generate_date_colors, ifc_to_uuid, normalize_guid, uuid_to_ifc};
pub use session::ProgressSessionJs;
pub use utils::set_panic_hook as init_panic_hook;
pub use viewer::{BridgeError, HostViewer, JsViewer};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    utils::set_panic_hook();
}

/// Get the version of Site-Progress
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
