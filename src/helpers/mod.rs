//! URL and asset helpers shared by the renderer and the generator

mod url;

pub use url::*;
