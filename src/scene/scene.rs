//! The entity-component scene store.
//!
//! [`Scene`] wraps a [`hecs::World`] and adds what the editor needs on top of
//! raw component storage:
//!
//! - a creation-order list, so outliner and traversal order are stable
//! - scene-wide unique entity names (see [`Scene::rename_entity`])
//! - the single active directional light that casts shadows
//! - outliner groups and CPU particle systems
//!
//! Component access is borrow-checked at runtime by hecs. Reading a component
//! the entity does not have is a programmer error: [`Scene::component`] and
//! [`Scene::component_mut`] panic, while [`Scene::try_component`] reports a
//! [`SceneError`].

use std::any::Any;
use std::sync::Arc;

use glam::Vec3;
use hecs::{Component, Entity, Ref, RefMut, World};

use super::components::{BaseEntityKind, Label, MeshComponent};
use super::particles::ParticleSystem;
use crate::geometry::Geometry;
use crate::light::{Light, LightKind};
use crate::transform::Transform;

/// Name of group 0, which holds everything not brought in by an import.
pub const DEFAULT_GROUP: &str = "Scene";

/// Radius given to point lights created from the "Add" menu.
pub const DEFAULT_POINT_RADIUS: f32 = 50.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("entity {0:?} does not exist")]
    NoSuchEntity(Entity),
    #[error("entity {entity:?} has no {component} component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },
    #[error("entity {0:?} does not carry a directional light")]
    NotDirectionalLight(Entity),
}

/// Geometry shared by every entity created from the same primitive kind.
#[derive(Debug)]
struct Primitives {
    cube: Arc<Geometry>,
    plane: Arc<Geometry>,
}

pub struct Scene {
    world: World,
    order: Vec<Entity>,
    directional_light: Option<Entity>,
    particle_systems: Vec<ParticleSystem>,
    groups: Vec<String>,
    primitives: Primitives,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("entities", &self.order.len())
            .field("directional_light", &self.directional_light)
            .field("particle_systems", &self.particle_systems.len())
            .field("groups", &self.groups)
            .finish()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            order: Vec::new(),
            directional_light: None,
            particle_systems: Vec::new(),
            groups: vec![DEFAULT_GROUP.to_owned()],
            primitives: Primitives {
                cube: Geometry::cube(),
                plane: Geometry::plane(10.0),
            },
        }
    }

    // ---- entities ----------------------------------------------------------

    /// Spawn an entity with a [`Label`] and a default [`Transform`].
    ///
    /// The name is made unique against every live entity first.
    pub fn create_entity(&mut self, name: &str) -> Entity {
        self.create_entity_in_group(name, 0)
    }

    pub fn create_entity_in_group(&mut self, name: &str, group_id: usize) -> Entity {
        let name = self.unique_name(name, None);
        let entity = self
            .world
            .spawn((Label::new(name, group_id), Transform::default()));
        self.order.push(entity);
        entity
    }

    /// Remove an entity and all of its components.
    ///
    /// Clears the active directional light if it lived on this entity.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), SceneError> {
        self.world
            .despawn(entity)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        self.order.retain(|&e| e != entity);
        if self.directional_light == Some(entity) {
            log::debug!("active directional light {entity:?} removed");
            self.directional_light = None;
        }
        Ok(())
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Live entities in creation order.
    ///
    /// The iterator borrows the scene, so entities cannot be added or removed
    /// while it is alive. Components may still be mutated through
    /// [`Scene::component_mut`].
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.order.iter().copied()
    }

    /// Visit every live entity in creation order.
    pub fn for_each_entity(&self, mut visitor: impl FnMut(Entity)) {
        for &entity in &self.order {
            visitor(entity);
        }
    }

    // ---- components --------------------------------------------------------

    /// Attach `component`, replacing any existing component of the same type.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        mut component: T,
    ) -> Result<(), SceneError> {
        if !self.world.contains(entity) {
            return Err(SceneError::NoSuchEntity(entity));
        }
        if let Some(label) = (&mut component as &mut dyn Any).downcast_mut::<Label>() {
            let name = self.unique_name(&label.name, Some(entity));
            label.name = name;
        }
        self.world
            .insert_one(entity, component)
            .map_err(|_| SceneError::NoSuchEntity(entity))?;
        // Replacing the active sun's light with another kind vacates the slot.
        if self.directional_light == Some(entity) && !self.is_directional(entity) {
            self.directional_light = None;
        }
        Ok(())
    }

    /// Detach a component, returning it if it was present.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let removed = self.world.remove_one::<T>(entity).ok();
        if removed.is_some() && self.directional_light == Some(entity) && !self.is_directional(entity)
        {
            self.directional_light = None;
        }
        removed
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.world
            .entity(entity)
            .map(|e| e.has::<T>())
            .unwrap_or(false)
    }

    /// Shared access to a component.
    ///
    /// # Panics
    ///
    /// Panics if the entity is gone, lacks a `T`, or the `T` is currently
    /// borrowed mutably. Guard with [`Scene::has_component`].
    pub fn component<T: Component>(&self, entity: Entity) -> Ref<'_, T> {
        match self.try_component::<T>(entity) {
            Ok(component) => component,
            Err(err) => panic!("{err}"),
        }
    }

    /// Exclusive access to a component.
    ///
    /// Takes `&self`: hecs tracks borrows per component type at runtime, so
    /// different component types of one entity can be held at once.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Scene::component`].
    pub fn component_mut<T: Component>(&self, entity: Entity) -> RefMut<'_, T> {
        match self.try_component_mut::<T>(entity) {
            Ok(component) => component,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_component<T: Component>(&self, entity: Entity) -> Result<Ref<'_, T>, SceneError> {
        self.world
            .get::<&T>(entity)
            .map_err(|err| component_error::<T>(entity, err))
    }

    pub fn try_component_mut<T: Component>(
        &self,
        entity: Entity,
    ) -> Result<RefMut<'_, T>, SceneError> {
        self.world
            .get::<&mut T>(entity)
            .map_err(|err| component_error::<T>(entity, err))
    }

    /// Name of an entity, or an empty string if it has no label.
    pub fn name(&self, entity: Entity) -> String {
        self.try_component::<Label>(entity)
            .map(|label| label.name.clone())
            .unwrap_or_default()
    }

    // ---- names -------------------------------------------------------------

    /// Set an entity's name and re-apply the uniqueness rule.
    ///
    /// Returns the name actually stored, which carries a numeric suffix when
    /// `name` was already taken by another entity.
    pub fn rename_entity(&mut self, entity: Entity, name: &str) -> Result<String, SceneError> {
        if !self.has_component::<Label>(entity) {
            return Err(self.missing::<Label>(entity));
        }
        let unique = self.unique_name(name, Some(entity));
        self.component_mut::<Label>(entity).name = unique.clone();
        Ok(unique)
    }

    /// `name` if no other live entity uses it, otherwise `stem_N` for the
    /// smallest free `N` starting at 1. An existing `_N` suffix is stripped
    /// first so `Cube_1` collides into `Cube_2`, not `Cube_1_1`.
    fn unique_name(&self, name: &str, ignore: Option<Entity>) -> String {
        let name = name.trim();
        let name = if name.is_empty() { "Entity" } else { name };

        let taken = |candidate: &str| {
            self.order.iter().any(|&entity| {
                Some(entity) != ignore
                    && self
                        .try_component::<Label>(entity)
                        .map(|label| label.name == candidate)
                        .unwrap_or(false)
            })
        };

        if !taken(name) {
            return name.to_owned();
        }

        let stem = strip_numeric_suffix(name);
        let unique = (1..)
            .map(|n| format!("{stem}_{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| name.to_owned());
        log::debug!("name {name:?} taken, using {unique:?}");
        unique
    }

    // ---- duplication -------------------------------------------------------

    /// Copy every component of `entity` onto a new entity.
    ///
    /// The label is uniquified; the transform is copied verbatim. Mesh
    /// geometry stays shared while the material becomes an independent copy.
    /// A duplicated directional light is never made the active one.
    pub fn duplicate_entity(&mut self, entity: Entity) -> Result<Entity, SceneError> {
        let label = Label::clone(&*self.try_component::<Label>(entity)?);
        let transform = self.try_component::<Transform>(entity).ok().map(|t| *t);
        let mesh = self
            .try_component::<MeshComponent>(entity)
            .ok()
            .map(|m| MeshComponent::clone(&m));
        let light = self.try_component::<Light>(entity).ok().map(|l| Light::clone(&l));

        let copy = self.create_entity_in_group(&label.name, label.group_id);
        if let Some(transform) = transform {
            self.add_component(copy, transform)?;
        }
        if let Some(mesh) = mesh {
            self.add_component(copy, mesh)?;
        }
        if let Some(light) = light {
            self.add_component(copy, light)?;
        }
        Ok(copy)
    }

    // ---- lights ------------------------------------------------------------

    /// Choose which directional light casts shadows.
    ///
    /// The scene does not take ownership; the slot refers to a light component
    /// already stored on `light`.
    pub fn set_directional_light(&mut self, light: Option<Entity>) -> Result<(), SceneError> {
        if let Some(entity) = light {
            if !self.contains(entity) {
                return Err(SceneError::NoSuchEntity(entity));
            }
            if !self.is_directional(entity) {
                return Err(SceneError::NotDirectionalLight(entity));
            }
        }
        self.directional_light = light;
        Ok(())
    }

    pub fn directional_light(&self) -> Option<Entity> {
        self.directional_light
    }

    fn is_directional(&self, entity: Entity) -> bool {
        self.try_component::<Light>(entity)
            .map(|light| matches!(light.kind, LightKind::Directional(_)))
            .unwrap_or(false)
    }

    /// Copy the entity's transform into its light's cached position/rotation.
    ///
    /// Returns `false` when the entity lacks either component.
    pub fn sync_light_transform(&self, entity: Entity) -> bool {
        let (Ok(transform), Ok(mut light)) = (
            self.try_component::<Transform>(entity),
            self.try_component_mut::<Light>(entity),
        ) else {
            return false;
        };
        light.sync_transform(&transform);
        true
    }

    // ---- factories ---------------------------------------------------------

    /// Create one of the editor's built-in entities.
    pub fn create_base_entity(&mut self, kind: BaseEntityKind) -> Entity {
        let entity = self.create_entity(kind.default_name());
        let (transform, mesh, light) = match kind {
            BaseEntityKind::Plane => (
                Transform::new(),
                Some(MeshComponent::new(Arc::clone(&self.primitives.plane))),
                None,
            ),
            BaseEntityKind::Cube => (
                Transform::from_location(Vec3::new(0.0, 0.5, 0.0)),
                Some(MeshComponent::new(Arc::clone(&self.primitives.cube))),
                None,
            ),
            BaseEntityKind::PointLight => (
                Transform::from_location(Vec3::new(0.0, 3.0, 0.0)),
                None,
                Some(Light::point(DEFAULT_POINT_RADIUS)),
            ),
            BaseEntityKind::DirectionalLight => {
                let light = Light::directional();
                let rotation = light
                    .as_directional()
                    .map(|d| d.rotation())
                    .unwrap_or_default();
                (
                    Transform::from_location(Vec3::new(0.0, 10.0, 0.0)).rotation(rotation),
                    None,
                    Some(light),
                )
            }
        };

        // The entity was just spawned, so these inserts cannot fail.
        let _ = self.add_component(entity, transform);
        if let Some(mesh) = mesh {
            let _ = self.add_component(entity, mesh);
        }
        if let Some(light) = light {
            let _ = self.add_component(entity, light);
            self.sync_light_transform(entity);
        }

        if kind == BaseEntityKind::DirectionalLight && self.directional_light.is_none() {
            self.directional_light = Some(entity);
        }
        log::debug!("created {:?} as {entity:?}", kind);
        entity
    }

    /// Shared unit cube, also used for light markers and particles.
    pub fn cube_geometry(&self) -> &Arc<Geometry> {
        &self.primitives.cube
    }

    // ---- groups ------------------------------------------------------------

    /// Append an outliner group and return its id.
    pub fn add_group(&mut self, name: impl Into<String>) -> usize {
        self.groups.push(name.into());
        self.groups.len() - 1
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn group_name(&self, group_id: usize) -> &str {
        self.groups
            .get(group_id)
            .map(String::as_str)
            .unwrap_or(DEFAULT_GROUP)
    }

    // ---- particle systems --------------------------------------------------

    /// Add a particle system with a default, unique name. Returns its index.
    pub fn add_particle_system(&mut self) -> usize {
        let mut name = "Particle System".to_owned();
        let mut n = 1;
        while self.particle_systems.iter().any(|p| p.name == name) {
            name = format!("Particle System_{n}");
            n += 1;
        }
        self.push_particle_system(ParticleSystem::new(name))
    }

    pub fn push_particle_system(&mut self, system: ParticleSystem) -> usize {
        self.particle_systems.push(system);
        self.particle_systems.len() - 1
    }

    /// Remove the system at `index`; later systems shift down by one.
    pub fn remove_particle_system_at(&mut self, index: usize) -> Option<ParticleSystem> {
        (index < self.particle_systems.len()).then(|| self.particle_systems.remove(index))
    }

    pub fn particle_systems(&self) -> &[ParticleSystem] {
        &self.particle_systems
    }

    pub fn particle_systems_mut(&mut self) -> &mut [ParticleSystem] {
        &mut self.particle_systems
    }

    /// Per-frame simulation step.
    pub fn update(&mut self, dt: f32) {
        for system in &mut self.particle_systems {
            system.update(dt);
        }
    }

    fn missing<T>(&self, entity: Entity) -> SceneError {
        if self.contains(entity) {
            SceneError::MissingComponent {
                entity,
                component: short_type_name::<T>(),
            }
        } else {
            SceneError::NoSuchEntity(entity)
        }
    }
}

fn component_error<T>(entity: Entity, err: hecs::ComponentError) -> SceneError {
    match err {
        hecs::ComponentError::NoSuchEntity => SceneError::NoSuchEntity(entity),
        hecs::ComponentError::MissingComponent(_) => SceneError::MissingComponent {
            entity,
            component: short_type_name::<T>(),
        },
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

fn strip_numeric_suffix(name: &str) -> &str {
    match name.rsplit_once('_') {
        Some((stem, digits))
            if !stem.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            stem
        }
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(scene: &Scene) -> Vec<String> {
        scene.entities().map(|e| scene.name(e)).collect()
    }

    #[test]
    fn create_entity_attaches_label_and_transform() {
        let mut scene = Scene::new();
        let e = scene.create_entity("Cube");
        assert!(scene.has_component::<Label>(e));
        assert_eq!(*scene.component::<Transform>(e), Transform::default());
        assert!(!scene.has_component::<MeshComponent>(e));
    }

    #[test]
    fn colliding_names_get_incrementing_suffix() {
        let mut scene = Scene::new();
        scene.create_entity("Cube");
        scene.create_entity("Cube");
        scene.create_entity("Cube");
        assert_eq!(names(&scene), ["Cube", "Cube_1", "Cube_2"]);
    }

    #[test]
    fn existing_suffix_is_not_stacked() {
        let mut scene = Scene::new();
        scene.create_entity("Cube");
        scene.create_entity("Cube");
        let e = scene.create_entity("Cube_1");
        assert_eq!(scene.name(e), "Cube_2");
    }

    #[test]
    fn renaming_to_own_name_keeps_it() {
        let mut scene = Scene::new();
        let e = scene.create_entity("Lamp");
        assert_eq!(scene.rename_entity(e, "Lamp").as_deref(), Ok("Lamp"));
    }

    #[test]
    fn rename_collision_is_suffixed() {
        let mut scene = Scene::new();
        scene.create_entity("A");
        let b = scene.create_entity("B");
        assert_eq!(scene.rename_entity(b, "A").as_deref(), Ok("A_1"));
    }

    #[test]
    fn add_component_replaces() {
        let mut scene = Scene::new();
        let e = scene.create_entity("E");
        scene
            .add_component(e, Transform::from_location(Vec3::X))
            .unwrap();
        scene
            .add_component(e, Transform::from_location(Vec3::Y))
            .unwrap();
        assert_eq!(scene.component::<Transform>(e).location, Vec3::Y);
    }

    #[test]
    fn missing_component_is_reported() {
        let mut scene = Scene::new();
        let e = scene.create_entity("E");
        let err = scene.try_component::<Light>(e).map(|_| ()).unwrap_err();
        assert_eq!(
            err,
            SceneError::MissingComponent {
                entity: e,
                component: "Light"
            }
        );
    }

    #[test]
    #[should_panic(expected = "has no Light component")]
    fn component_panics_when_absent() {
        let mut scene = Scene::new();
        let e = scene.create_entity("E");
        let _ = scene.component::<Light>(e);
    }

    #[test]
    fn traversal_is_in_creation_order_and_restartable() {
        let mut scene = Scene::new();
        let a = scene.create_entity("A");
        let b = scene.create_entity("B");
        let c = scene.create_entity("C");
        scene.destroy_entity(b).unwrap();

        let mut first = Vec::new();
        scene.for_each_entity(|e| first.push(e));
        let second: Vec<_> = scene.entities().collect();
        assert_eq!(first, [a, c]);
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_copies_components() {
        let mut scene = Scene::new();
        let original = scene.create_base_entity(BaseEntityKind::Cube);
        scene
            .add_component(original, Transform::from_location(Vec3::new(1.0, 2.0, 3.0)))
            .unwrap();

        let copy = scene.duplicate_entity(original).unwrap();
        assert_ne!(copy, original);
        assert_eq!(scene.name(copy), "Cube_1");
        assert_eq!(
            *scene.component::<Transform>(copy),
            *scene.component::<Transform>(original)
        );

        scene
            .component_mut::<MeshComponent>(copy)
            .material
            .set_diffuse(Vec3::ZERO);
        assert_ne!(
            scene.component::<MeshComponent>(original).material.diffuse,
            Vec3::ZERO
        );
        assert!(Arc::ptr_eq(
            &scene.component::<MeshComponent>(original).geometry,
            &scene.component::<MeshComponent>(copy).geometry
        ));
    }

    #[test]
    fn first_directional_light_becomes_active() {
        let mut scene = Scene::new();
        let sun = scene.create_base_entity(BaseEntityKind::DirectionalLight);
        let second = scene.create_base_entity(BaseEntityKind::DirectionalLight);
        assert_eq!(scene.directional_light(), Some(sun));

        scene.set_directional_light(Some(second)).unwrap();
        assert_eq!(scene.directional_light(), Some(second));
    }

    #[test]
    fn directional_slot_rejects_other_entities() {
        let mut scene = Scene::new();
        let lamp = scene.create_base_entity(BaseEntityKind::PointLight);
        assert_eq!(
            scene.set_directional_light(Some(lamp)),
            Err(SceneError::NotDirectionalLight(lamp))
        );
        assert_eq!(scene.directional_light(), None);
    }

    #[test]
    fn destroying_active_light_clears_slot() {
        let mut scene = Scene::new();
        let sun = scene.create_base_entity(BaseEntityKind::DirectionalLight);
        scene.destroy_entity(sun).unwrap();
        assert_eq!(scene.directional_light(), None);
        assert!(scene.destroy_entity(sun).is_err());
    }

    #[test]
    fn removing_light_component_clears_slot() {
        let mut scene = Scene::new();
        let sun = scene.create_base_entity(BaseEntityKind::DirectionalLight);
        assert!(scene.remove_component::<Light>(sun).is_some());
        assert_eq!(scene.directional_light(), None);
    }

    #[test]
    fn replacing_sun_light_with_point_light_clears_slot() {
        let mut scene = Scene::new();
        let sun = scene.create_base_entity(BaseEntityKind::DirectionalLight);
        scene.add_component(sun, Light::point(50.0)).unwrap();
        assert_eq!(scene.directional_light(), None);
        assert_eq!(
            scene.set_directional_light(Some(sun)),
            Err(SceneError::NotDirectionalLight(sun))
        );
    }

    #[test]
    fn inserted_label_is_uniquified() {
        let mut scene = Scene::new();
        scene.create_entity("Cube");
        let other = scene.create_entity("Sphere");
        scene.add_component(other, Label::new("Cube", 0)).unwrap();
        assert_eq!(scene.name(other), "Cube_1");

        // Re-inserting an entity's own name keeps it.
        scene.add_component(other, Label::new("Cube_1", 0)).unwrap();
        assert_eq!(scene.name(other), "Cube_1");
    }

    #[test]
    fn add_component_to_dead_entity_fails() {
        let mut scene = Scene::new();
        let e = scene.create_entity("E");
        scene.destroy_entity(e).unwrap();
        assert_eq!(
            scene.add_component(e, Transform::default()),
            Err(SceneError::NoSuchEntity(e))
        );
    }

    #[test]
    fn base_point_light_caches_its_position() {
        let mut scene = Scene::new();
        let lamp = scene.create_base_entity(BaseEntityKind::PointLight);
        let light = scene.component::<Light>(lamp);
        assert_eq!(
            light.as_point().map(|p| p.position()),
            Some(Vec3::new(0.0, 3.0, 0.0))
        );
    }

    #[test]
    fn particle_systems_are_indexed() {
        let mut scene = Scene::new();
        assert_eq!(scene.add_particle_system(), 0);
        assert_eq!(scene.add_particle_system(), 1);
        assert_eq!(scene.particle_systems()[1].name, "Particle System_1");

        let removed = scene.remove_particle_system_at(0).unwrap();
        assert_eq!(removed.name, "Particle System");
        assert_eq!(scene.particle_systems().len(), 1);
        assert!(scene.remove_particle_system_at(5).is_none());
    }

    #[test]
    fn groups_start_with_scene() {
        let mut scene = Scene::new();
        assert_eq!(scene.groups(), [DEFAULT_GROUP]);
        let id = scene.add_group("teapot");
        assert_eq!(scene.group_name(id), "teapot");
        assert_eq!(scene.group_name(99), DEFAULT_GROUP);
    }
}
