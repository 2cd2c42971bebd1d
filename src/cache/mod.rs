//! Binary model cache.
//!
//! File layout:
//!
//! ```text
//! (VERSION:2)(<plugin info>)[TXFM_1]<transform payload> ...
//! ```
//!
//! Each node starts with a `[NAME]` tag and carries a fixed-width payload
//! (see [`stream`] for the scalar encoding). Shared nodes are written in
//! full once; later holders emit only the bare tag, which the reader
//! resolves against nodes already read.

mod canonical;
mod reader;
mod source;
pub mod stream;
mod writer;

pub use canonical::promote_unwritten_refs;
pub use source::CacheSource;

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};

use crate::node::{NodeId, NodeKind, SceneGraph};
use crate::util::{Error, Result};

use reader::CacheReader;
use stream::{IStream, OStream};
use writer::CacheWriter;

/// Version field written at the head of every cache.
pub const CACHE_VERSION: &str = "VERSION:2";

/// Plugin field used when the producer gives none.
pub const INTERNAL_PLUGIN_INFO: &str = "INTERNAL:0.0.0.0";

/// Options for [`write_cache`].
#[derive(Clone, Debug, Default)]
pub struct CacheWriteOptions {
    /// Replace an existing file.
    pub overwrite: bool,
    /// Producer identification stored in the header.
    pub plugin_info: Option<String>,
}

impl CacheWriteOptions {
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn plugin_info(mut self, info: impl Into<String>) -> Self {
        self.plugin_info = Some(info.into());
        self
    }
}

/// Options for [`read_cache_with`].
#[derive(Clone, Debug)]
pub struct CacheReadOptions {
    /// Memory-map the file instead of reading it into a buffer.
    pub use_mmap: bool,
}

impl Default for CacheReadOptions {
    fn default() -> Self {
        Self { use_mmap: true }
    }
}

/// A model loaded from a cache file.
#[derive(Debug)]
pub struct CacheModel {
    pub graph: SceneGraph,
    pub root: NodeId,
    pub plugin_info: String,
}

/// Write the model containing `node` to `path`.
///
/// Any node of the tree may be passed; the write always starts at the
/// tree's root, which must be a transform. The tree is canonicalized and
/// renamed first (see [`write_cache_to`]). A partially written file is
/// removed on failure.
pub fn write_cache(
    graph: &mut SceneGraph,
    node: NodeId,
    path: impl AsRef<Path>,
    options: &CacheWriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    check_target(path, options.overwrite)?;

    let mut out = OStream::create(path)?;
    let res = write_cache_to(graph, node, &mut out, options.plugin_info.as_deref())
        .and_then(|()| out.flush());
    drop(out);

    match res {
        Ok(()) => {
            debug!("wrote cache {}", path.display());
            Ok(())
        }
        Err(e) => {
            if let Err(rm) = fs::remove_file(path) {
                warn!("could not remove partial cache {}: {rm}", path.display());
            }
            Err(e)
        }
    }
}

/// Write the model containing `node` to an output stream.
///
/// Shared references are promoted so every payload precedes its bare-tag
/// uses, then names are regenerated in write order and written flags
/// cleared. The graph is modified by both steps.
pub fn write_cache_to<W: Write>(
    graph: &mut SceneGraph,
    node: NodeId,
    out: &mut OStream<W>,
    plugin_info: Option<&str>,
) -> Result<()> {
    let root = graph
        .root_of(node)
        .ok_or_else(|| Error::invalid_node("dangling node id"))?;
    if graph.kind(root) != Some(NodeKind::Transform) {
        return Err(Error::invalid_node(format!(
            "cache root must be a transform, found {:?}",
            graph.kind(root)
        )));
    }

    let promoted = promote_unwritten_refs(graph, root);
    if promoted > 0 {
        debug!("promoted {promoted} shared nodes before writing");
    }
    graph.reset_node_index();
    graph.rename_nodes(root);
    graph.clear_written();

    out.write_header_field(CACHE_VERSION)?;
    out.write_header_field(plugin_info.unwrap_or(INTERNAL_PLUGIN_INFO))?;
    CacheWriter::new(graph, out).write_node(root)?;
    debug!("cache payload {} bytes", out.pos());
    Ok(())
}

/// Read a cache file, accepting any plugin tag.
pub fn read_cache(path: impl AsRef<Path>) -> Result<CacheModel> {
    read_cache_with(path, &CacheReadOptions::default(), None)
}

/// Read a cache file. `tag_check`, if given, must accept the plugin tag.
pub fn read_cache_with(
    path: impl AsRef<Path>,
    options: &CacheReadOptions,
    tag_check: Option<&dyn Fn(&str) -> bool>,
) -> Result<CacheModel> {
    let path = path.as_ref();
    let source = CacheSource::open(path, options.use_mmap)?;
    let model = read_cache_from_bytes(source.as_bytes(), tag_check)?;
    debug!("read cache {} ({} nodes)", path.display(), model.graph.len());
    Ok(model)
}

/// Parse a complete cache image.
pub fn read_cache_from_bytes(
    bytes: &[u8],
    tag_check: Option<&dyn Fn(&str) -> bool>,
) -> Result<CacheModel> {
    let mut input = IStream::new(bytes);
    let plugin_info = read_header(&mut input)?;
    if let Some(check) = tag_check {
        if !check(&plugin_info) {
            return Err(Error::PluginTagRejected(plugin_info));
        }
    }
    let (graph, root) = CacheReader::new(input).read_root()?;
    Ok(CacheModel { graph, root, plugin_info })
}

/// Version and plugin fields of a cache file.
pub fn read_cache_header(path: impl AsRef<Path>) -> Result<(String, String)> {
    let source = CacheSource::open(path, false)?;
    let mut input = IStream::new(source.as_bytes());
    let version = input.read_header_field()?;
    let plugin = input.read_header_field()?;
    Ok((version, plugin))
}

fn read_header(input: &mut IStream<'_>) -> Result<String> {
    let version = input.read_header_field()?;
    if version != CACHE_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    input.read_header_field()
}

/// Refuse to clobber a file unless asked, and never write over a non-file.
pub(crate) fn check_target(path: &Path, overwrite: bool) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if !meta.is_file() => Err(Error::NotAFile(path.to_path_buf())),
        Ok(_) if !overwrite => Err(Error::FileExists(path.to_path_buf())),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}
