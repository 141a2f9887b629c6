//! Model import into a [`Scene`].
//!
//! Supported formats, picked by file extension:
//!
//! - `.stl` (binary or ASCII) becomes a single entity
//! - `.gltf` / `.glb` becomes one entity per triangle primitive, placed with
//!   its node's world transform and shaded with the primitive's base color and
//!   roughness factors
//!
//! A file is parsed completely before anything is added to the scene, so a
//! failed import leaves the scene exactly as it was.

use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use gltf::mesh::Mode;
use hecs::Entity;

use crate::geometry::{Geometry, RawGeometry};
use crate::mesh::Vertex3d;
use crate::scene::{Material, MeshComponent, Scene};
use crate::transform::Transform;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported model format {0:?}")]
    UnknownFormat(String),
    #[error("invalid STL data: {0}")]
    Stl(#[source] std::io::Error),
    #[error("invalid glTF data: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("{0} contains no triangles")]
    Empty(PathBuf),
}

/// One drawable piece of an imported model.
#[derive(Debug)]
pub struct ImportedPart {
    pub name: String,
    pub geometry: RawGeometry,
    pub transform: Transform,
    pub material: Material,
}

/// A fully parsed model, not yet added to any scene.
#[derive(Debug)]
pub struct ImportedModel {
    /// File stem, used as the outliner group name.
    pub name: String,
    pub parts: Vec<ImportedPart>,
}

/// Parse a model file.
pub fn load(path: &Path) -> Result<ImportedModel, ImportError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Model")
        .to_owned();

    let parts = match ext.as_str() {
        "stl" => vec![load_stl(path, &name)?],
        "gltf" | "glb" => load_gltf(path)?,
        _ => return Err(ImportError::UnknownFormat(ext)),
    };

    if parts.is_empty() {
        return Err(ImportError::Empty(path.to_owned()));
    }
    Ok(ImportedModel { name, parts })
}

/// Parse `path` and add its parts to `scene` under a new group.
///
/// Returns the created entities in part order.
pub fn import_into(scene: &mut Scene, path: &Path) -> Result<Vec<Entity>, ImportError> {
    let model = load(path)?;
    Ok(insert(scene, model))
}

/// Import and log the outcome; the editor's menu action.
pub fn import_model(scene: &mut Scene, path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match import_into(scene, path) {
        Ok(entities) => {
            log::info!("imported {} ({} entities)", path.display(), entities.len());
            true
        }
        Err(err) => {
            log::warn!("import of {} failed: {err}", path.display());
            false
        }
    }
}

fn insert(scene: &mut Scene, model: ImportedModel) -> Vec<Entity> {
    let group = scene.add_group(model.name);
    model
        .parts
        .into_iter()
        .map(|part| {
            let entity = scene.create_entity_in_group(&part.name, group);
            let geometry = Geometry::new(part.name, part.geometry);
            // Freshly spawned, inserts cannot fail.
            let _ = scene.add_component(entity, part.transform);
            let _ = scene.add_component(
                entity,
                MeshComponent::new(geometry).with_material(part.material),
            );
            entity
        })
        .collect()
}

fn load_stl(path: &Path, name: &str) -> Result<ImportedPart, ImportError> {
    let file = std::fs::File::open(path).map_err(|source| ImportError::Io {
        path: path.to_owned(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    let geometry = parse_stl(&mut reader)?;
    if geometry.is_empty() {
        return Err(ImportError::Empty(path.to_owned()));
    }

    Ok(ImportedPart {
        name: name.to_owned(),
        geometry,
        transform: Transform::new(),
        material: Material::default(),
    })
}

/// Flatten an STL into unshared vertices carrying the face normals.
pub fn parse_stl<R: std::io::Read + std::io::Seek>(
    reader: &mut R,
) -> Result<RawGeometry, ImportError> {
    let stl = stl_io::read_stl(reader).map_err(ImportError::Stl)?;

    let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
    let mut indices = Vec::with_capacity(stl.faces.len() * 3);

    for face in &stl.faces {
        let normal: [f32; 3] = face.normal.into();
        let base = vertices.len() as u32;
        for &vertex_idx in &face.vertices {
            let Some(vertex) = stl.vertices.get(vertex_idx) else {
                continue;
            };
            vertices.push(Vertex3d::new((*vertex).into(), normal, [0.0, 0.0]));
        }
        if vertices.len() as u32 == base + 3 {
            indices.extend_from_slice(&[base, base + 1, base + 2]);
        } else {
            vertices.truncate(base as usize);
        }
    }

    let mut geometry = RawGeometry::new(vertices, indices);
    if geometry
        .vertices
        .iter()
        .all(|v| Vec3::from(v.normal).length_squared() == 0.0)
    {
        geometry.recalculate_normals();
    }
    Ok(geometry)
}

fn load_gltf(path: &Path) -> Result<Vec<ImportedPart>, ImportError> {
    let (document, buffers, _images) = gltf::import(path)?;

    let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) else {
        return Ok(Vec::new());
    };

    let mut parts = Vec::new();
    let mut stack: Vec<(gltf::Node, Mat4)> =
        scene.nodes().map(|node| (node, Mat4::IDENTITY)).collect();

    while let Some((node, parent)) = stack.pop() {
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
        stack.extend(node.children().map(|child| (child, world)));

        let Some(mesh) = node.mesh() else {
            continue;
        };
        let base_name = mesh
            .name()
            .or_else(|| node.name())
            .unwrap_or("Mesh")
            .to_owned();

        for primitive in mesh.primitives() {
            if primitive.mode() != Mode::Triangles {
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| &b.0[..]));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            if positions.is_empty() {
                continue;
            }

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|it| it.collect())
                .unwrap_or_default();
            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|it| it.into_f32().collect())
                .unwrap_or_default();
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|it| it.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let has_normals = normals.len() == positions.len();
            let vertices = positions
                .iter()
                .enumerate()
                .map(|(i, &position)| {
                    let normal = if has_normals { normals[i] } else { [0.0; 3] };
                    let uv = uvs.get(i).copied().unwrap_or([0.0, 0.0]);
                    Vertex3d::new(position, normal, uv)
                })
                .collect();

            let mut geometry = RawGeometry::new(vertices, indices);
            if !has_normals {
                geometry.recalculate_normals();
            }
            if geometry.is_empty() {
                continue;
            }

            let pbr = primitive.material().pbr_metallic_roughness();
            let [r, g, b, _] = pbr.base_color_factor();
            let material = Material::new(Vec3::new(r, g, b), pbr.roughness_factor());

            parts.push(ImportedPart {
                name: base_name.clone(),
                geometry,
                transform: Transform::decompose(&world).unwrap_or_default(),
                material,
            });
        }
    }

    Ok(parts)
}
