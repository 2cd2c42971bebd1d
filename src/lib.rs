//! # Scenegraph
//!
//! Scene-graph model cache for 3D component models: a tree of transforms,
//! shapes and indexed face sets with shared (referenced) subtrees.
//!
//! ## Modules
//!
//! - [`util`] - Errors and value primitives (colors, points, unit vectors)
//! - [`node`] - Node arena and the ownership/reference protocol
//! - [`cache`] - Binary model cache reader and writer
//! - [`vrml`] - VRML2.0 export
//! - [`mesh`] - Flattening into renderer-ready meshes
//!
//! ## Example
//!
//! ```ignore
//! use scenegraph::prelude::*;
//!
//! let mut g = SceneGraph::new();
//! let root = g.new_transform(None);
//! let shape = g.new_shape(Some(root));
//! let face = g.new_faceset(Some(shape));
//! // ... fill coordinates and indices, then
//! g.calc_normals(face);
//! write_cache(&mut g, root, "part.cache", &CacheWriteOptions::default())?;
//! let model = get_model(&g, root);
//! ```

pub mod util;
pub mod node;
pub mod cache;
pub mod vrml;
pub mod mesh;

// Re-export commonly used types
pub use util::{Error, Result};
pub use node::{NodeId, NodeKind, SceneGraph};

/// Library version as `(major, minor, patch, revision)`.
pub fn lib_version() -> (u32, u32, u32, u32) {
    let part = |s: &str| s.parse().unwrap_or(0);
    (
        part(env!("CARGO_PKG_VERSION_MAJOR")),
        part(env!("CARGO_PKG_VERSION_MINOR")),
        part(env!("CARGO_PKG_VERSION_PATCH")),
        0,
    )
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Color, Error, Point3, Result, UnitVector3};
    pub use crate::node::{Link, NodeHandle, NodeId, NodeKind, SceneGraph};
    pub use crate::cache::{
        read_cache, read_cache_with, write_cache, CacheModel, CacheReadOptions, CacheWriteOptions,
    };
    pub use crate::vrml::{write_vrml, VrmlOptions};
    pub use crate::mesh::{get_model, S3DModel, SMaterial, SMesh};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_lib_version() {
        let (major, minor, patch, _) = super::lib_version();
        let v = format!("{major}.{minor}.{patch}");
        assert_eq!(v, env!("CARGO_PKG_VERSION"));
    }
}
