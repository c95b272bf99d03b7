use std::path::{Path, PathBuf};

use glam::{Mat4, Quat, Vec3};
use gltf::mesh::Mode;
use log::{debug, info};

use crate::error::LoadError;
use crate::mesh::MeshData;
use crate::scene::{Model, PartId, Transform};

/// Where the model asset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// File on disk (native builds).
    Path(PathBuf),
    /// URL fetched by the browser (WebAssembly builds).
    Url(String),
    /// Bytes already in memory.
    Bytes(Vec<u8>),
}

impl AssetSource {
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
            Self::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

/// Resolves the asset into a [`Model`]. Nothing is retried.
pub async fn load_model(source: &AssetSource) -> Result<Model, LoadError> {
    let model = match source {
        AssetSource::Bytes(bytes) => model_from_slice(bytes)?,
        AssetSource::Path(path) => read_model(path)?,
        AssetSource::Url(url) => {
            let bytes = fetch(url).await?;
            model_from_slice(&bytes)?
        }
    };
    info!("loaded {} with {} part(s)", source.describe(), model.len());
    Ok(model)
}

/// Parses a self-contained glTF (`.glb`, or `.gltf` with embedded buffers).
pub fn model_from_slice(bytes: &[u8]) -> Result<Model, LoadError> {
    let (document, buffers, _images) = gltf::import_slice(bytes)?;
    build_model(&document, &buffers)
}

#[cfg(not(target_arch = "wasm32"))]
fn read_model(path: &Path) -> Result<Model, LoadError> {
    std::fs::metadata(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (document, buffers, _images) = gltf::import(path)?;
    build_model(&document, &buffers)
}

#[cfg(target_arch = "wasm32")]
fn read_model(path: &Path) -> Result<Model, LoadError> {
    Err(LoadError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "the browser build loads assets by URL",
        ),
    })
}

#[cfg(target_arch = "wasm32")]
async fn fetch(url: &str) -> Result<Vec<u8>, LoadError> {
    crate::web::fetch_bytes(url).await
}

#[cfg(not(target_arch = "wasm32"))]
async fn fetch(url: &str) -> Result<Vec<u8>, LoadError> {
    Err(LoadError::Fetch {
        url: url.to_string(),
        reason: "URLs are only supported in the browser build".to_string(),
    })
}

fn build_model(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Model, LoadError> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(LoadError::EmptyScene)?;

    let mut model = Model::new();
    let mut pending: Vec<(gltf::Node<'_>, Option<PartId>)> =
        scene.nodes().map(|node| (node, None)).collect();
    pending.reverse();
    while let Some((node, parent)) = pending.pop() {
        let name = node.name().unwrap_or_default();
        let id = model.add_part(name, parent, node_transform(&node));
        if let Some(mesh) = node.mesh() {
            if let (Some((data, color)), Some(part)) =
                (read_mesh(&mesh, buffers), model.part_mut(id))
            {
                part.mesh = Some(data);
                part.color = color;
            }
        }
        let first_child = pending.len();
        pending.extend(node.children().map(|child| (child, Some(id))));
        pending[first_child..].reverse();
    }

    if model.is_empty() {
        return Err(LoadError::EmptyScene);
    }
    Ok(model)
}

fn node_transform(node: &gltf::Node<'_>) -> Transform {
    match node.transform() {
        gltf::scene::Transform::Matrix { matrix } => {
            Transform::from_matrix(Mat4::from_cols_array_2d(&matrix))
        }
        gltf::scene::Transform::Decomposed {
            translation,
            rotation,
            scale,
        } => Transform {
            translation: Vec3::from(translation),
            rotation: Quat::from_array(rotation).normalize(),
            scale: Vec3::from(scale),
        },
    }
}

/// Merges every triangle primitive of the mesh. The base color comes from
/// the first primitive's material.
fn read_mesh(
    mesh: &gltf::Mesh<'_>,
    buffers: &[gltf::buffer::Data],
) -> Option<(MeshData, Vec3)> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut has_normals = true;
    let mut indices: Vec<u32> = Vec::new();
    let mut color = None;

    for primitive in mesh.primitives() {
        if primitive.mode() != Mode::Triangles {
            debug!(
                "skipping {:?} primitive in mesh {:?}",
                primitive.mode(),
                mesh.name()
            );
            continue;
        }
        let reader =
            primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
        let Some(primitive_positions) = reader.read_positions() else {
            continue;
        };
        let base = positions.len() as u32;
        positions.extend(primitive_positions.map(Vec3::from));
        let count = positions.len() as u32 - base;

        match reader.read_normals() {
            Some(primitive_normals) if has_normals => {
                normals.extend(primitive_normals.map(Vec3::from));
            }
            _ => has_normals = false,
        }

        match reader.read_indices() {
            Some(read) => indices.extend(read.into_u32().map(|index| base + index)),
            None => indices.extend(base..base + count),
        }

        color.get_or_insert_with(|| {
            let [r, g, b, _] = primitive
                .material()
                .pbr_metallic_roughness()
                .base_color_factor();
            Vec3::new(r, g, b)
        });
    }

    if positions.is_empty() {
        return None;
    }
    let normals = has_normals.then_some(normals.as_slice());
    Some((
        MeshData::from_attributes(&positions, normals, indices),
        color.unwrap_or(Vec3::ONE),
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a binary glTF with a `keycap` root holding two unit quads:
    /// `sa_low` at y=1 and `case` at x=5.
    pub(crate) fn keycap_glb() -> Vec<u8> {
        let positions: [[f32; 3]; 4] = [
            [-1.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 0.0, -1.0],
            [-1.0, 0.0, -1.0],
        ];
        let indices: [u32; 6] = [0, 1, 2, 0, 2, 3];
        let mut bin = Vec::new();
        for position in positions {
            for component in position {
                bin.extend_from_slice(&component.to_le_bytes());
            }
        }
        for index in indices {
            bin.extend_from_slice(&index.to_le_bytes());
        }

        let json = format!(
            r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [
    {{"name": "keycap", "children": [1, 2]}},
    {{"name": "sa_low", "mesh": 0, "translation": [0.0, 1.0, 0.0]}},
    {{"name": "case", "mesh": 0, "translation": [5.0, 0.0, 0.0]}}
  ],
  "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1}}]}}],
  "buffers": [{{"byteLength": {len}}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 48, "target": 34962}},
    {{"buffer": 0, "byteOffset": 48, "byteLength": 24, "target": 34963}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3",
      "min": [-1.0, 0.0, -1.0], "max": [1.0, 0.0, 1.0]}},
    {{"bufferView": 1, "componentType": 5125, "count": 6, "type": "SCALAR"}}
  ]
}}"#,
            len = bin.len()
        );
        glb(json.as_bytes(), &bin)
    }

    fn glb(json: &[u8], bin: &[u8]) -> Vec<u8> {
        let pad = |len: usize| (4 - len % 4) % 4;
        let json_len = json.len() + pad(json.len());
        let bin_len = bin.len() + pad(bin.len());
        let total = 12 + 8 + json_len + 8 + bin_len;

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json_len as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(json);
        out.extend(std::iter::repeat(b' ').take(pad(json.len())));
        out.extend_from_slice(&(bin_len as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(bin);
        out.extend(std::iter::repeat(0u8).take(pad(bin.len())));
        out
    }

    #[test]
    fn loads_named_part_tree() {
        let model = model_from_slice(&keycap_glb()).unwrap();
        assert_eq!(model.len(), 3);
        let names: Vec<_> = model
            .traverse()
            .map(|id| model.part(id).unwrap().name.clone())
            .collect();
        assert_eq!(names, ["keycap", "sa_low", "case"]);
        // Parts are stored in depth-first order.
        let ids: Vec<_> = model.traverse().collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

        let low = model.find("sa_low").unwrap();
        let part = model.part(low).unwrap();
        assert_eq!(part.transform.translation, Vec3::new(0.0, 1.0, 0.0));
        let mesh = part.mesh.as_ref().unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.indices.len(), 6);
        // Normals were absent and get recomputed facing up.
        assert!((Vec3::from_slice(&mesh.vertices[3..6]) - Vec3::Y).length() < 1e-5);

        let root = model.find("keycap").unwrap();
        assert!(model.part(root).unwrap().mesh.is_none());
    }

    #[test]
    fn garbage_is_a_gltf_error() {
        let err = model_from_slice(b"definitely not a model").unwrap_err();
        assert!(matches!(err, LoadError::Gltf(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let source = AssetSource::Path(PathBuf::from("does/not/exist.glb"));
        let err = pollster::block_on(load_model(&source)).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("does/not/exist.glb"));
    }

    #[test]
    fn bytes_source_loads_asynchronously() {
        let source = AssetSource::Bytes(keycap_glb());
        let model = pollster::block_on(load_model(&source)).unwrap();
        assert!(model.find("case").is_some());
    }
}
