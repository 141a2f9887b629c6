//! Scene data: the entity store, its component types and particle systems.
//!
//! # Example
//!
//! ```
//! use vantage::scene::{BaseEntityKind, Scene};
//! use vantage::Transform;
//!
//! let mut scene = Scene::new();
//! let cube = scene.create_base_entity(BaseEntityKind::Cube);
//! let copy = scene.duplicate_entity(cube).unwrap();
//!
//! assert_eq!(scene.name(copy), "Cube_1");
//! assert_eq!(
//!     *scene.component::<Transform>(copy),
//!     *scene.component::<Transform>(cube),
//! );
//! ```

pub mod components;
pub mod particles;
#[allow(clippy::module_inception)]
pub mod scene;

pub use components::{BaseEntityKind, Label, Material, MaterialUniforms, MeshComponent};
pub use particles::{EmitterSettings, Particle, ParticleSystem};
pub use scene::{DEFAULT_GROUP, DEFAULT_POINT_RADIUS, Scene, SceneError};
