//! Menu bar, outliner and property panels.

use glam::Vec3;
use hecs::Entity;

use crate::bridge::{self, Bridge};
use crate::importer;
use crate::light::{Light, LightKind, POINT_RADIUS_RANGE, ShadowResolution};
use crate::render::SceneRenderer;
use crate::scene::{BaseEntityKind, Label, MeshComponent};
use crate::transform::Transform;

use super::Editor;

fn vec3_row(ui: &mut egui::Ui, label: &str, value: &mut Vec3, speed: f32) -> bool {
    ui.horizontal(|ui| {
        ui.label(label);
        let mut changed = false;
        for component in [&mut value.x, &mut value.y, &mut value.z] {
            changed |= ui
                .add(egui::DragValue::new(component).speed(speed))
                .changed();
        }
        changed
    })
    .inner
}

fn float_row(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut f32,
    speed: f32,
    range: std::ops::RangeInclusive<f32>,
) -> bool {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::DragValue::new(value).speed(speed).range(range))
            .changed()
    })
    .inner
}

impl Editor {
    pub(super) fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    ui.menu_button("Import", |ui| {
                        ui.label("Path to .gltf, .glb or .stl");
                        ui.text_edit_singleline(&mut self.import_path);
                        if ui.button("Import").clicked() {
                            let path = self.import_path.trim().to_owned();
                            if !path.is_empty() {
                                importer::import_model(&mut self.scene, &path);
                            }
                            ui.close();
                        }
                    });
                });

                ui.menu_button("Add", |ui| {
                    let mut add = None;
                    ui.menu_button("Mesh", |ui| {
                        if ui.button("Plane").clicked() {
                            add = Some(BaseEntityKind::Plane);
                        }
                        if ui.button("Cube").clicked() {
                            add = Some(BaseEntityKind::Cube);
                        }
                    });
                    ui.menu_button("Light", |ui| {
                        if ui.button("Point").clicked() {
                            add = Some(BaseEntityKind::PointLight);
                        }
                        if ui.button("Directional").clicked() {
                            add = Some(BaseEntityKind::DirectionalLight);
                        }
                    });
                    if let Some(kind) = add {
                        let entity = self.scene.create_base_entity(kind);
                        log::debug!("added {}", self.scene.name(entity));
                        self.selection = Some(entity);
                        ui.close();
                    }
                });
            });
        });
    }

    /// World Outliner: entities grouped by their label's group.
    pub(super) fn outliner(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("world_outliner")
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("World Outliner");
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let mut grouped: Vec<Vec<(Entity, String)>> =
                        vec![Vec::new(); self.scene.groups().len()];
                    for entity in self.scene.entities() {
                        let group = self
                            .scene
                            .try_component::<Label>(entity)
                            .map(|label| label.group_id)
                            .unwrap_or(0);
                        if let Some(bucket) = grouped.get_mut(group) {
                            bucket.push((entity, self.scene.name(entity)));
                        }
                    }

                    for (group_id, entities) in grouped.iter().enumerate() {
                        if entities.is_empty() {
                            continue;
                        }
                        egui::CollapsingHeader::new(self.scene.group_name(group_id).to_owned())
                            .id_salt(("group", group_id))
                            .default_open(true)
                            .show(ui, |ui| {
                                for (entity, name) in entities {
                                    let selected = self.selection == Some(*entity);
                                    if ui.selectable_label(selected, name.as_str()).clicked() {
                                        self.selection = Some(*entity);
                                    }
                                }
                            });
                    }
                });
            });
    }

    /// Right-hand panels. Returns true if a light edit needs
    /// [`SceneRenderer::update_light`].
    pub(super) fn properties(
        &mut self,
        ctx: &egui::Context,
        renderer: &mut dyn SceneRenderer,
    ) -> bool {
        let mut light_changed = false;
        egui::SidePanel::right("properties")
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if let Some(entity) = self.selection.filter(|&e| self.scene.contains(e)) {
                        light_changed |= self.object_panel(ui, entity);
                        light_changed |= self.light_panel(ui, entity);
                        self.material_panel(ui, entity);
                    }
                    self.performance_panel(ui, renderer);
                    bridge_panel(ui, &mut renderer.settings_mut().renderer);
                    bridge_panel(ui, &mut renderer.settings_mut().shadows);
                    self.particle_panels(ui);
                });
            });
        light_changed
    }

    fn object_panel(&mut self, ui: &mut egui::Ui, entity: Entity) -> bool {
        if !self.scene.has_component::<Transform>(entity) {
            return false;
        }
        let mut light_changed = false;
        egui::CollapsingHeader::new("Object")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Label");
                    ui.text_edit_singleline(&mut self.rename_buffer);
                    if ui.button("Rename").clicked() {
                        match self.scene.rename_entity(entity, &self.rename_buffer) {
                            Ok(name) => self.rename_buffer = name,
                            Err(err) => log::warn!("rename failed: {err}"),
                        }
                    }
                });

                ui.label("Transform");
                let changed = {
                    let mut transform = self.scene.component_mut::<Transform>(entity);
                    let mut changed = vec3_row(ui, "Location", &mut transform.location, 0.1);
                    changed |= vec3_row(ui, "Rotation", &mut transform.rotation, 0.1);
                    changed |= vec3_row(ui, "Scale", &mut transform.scale, 0.01);
                    changed
                };
                if changed && self.scene.sync_light_transform(entity) {
                    light_changed = true;
                }
            });
        light_changed
    }

    fn light_panel(&mut self, ui: &mut egui::Ui, entity: Entity) -> bool {
        let Ok(mut light) = self.scene.try_component_mut::<Light>(entity) else {
            return false;
        };
        let mut changed = false;
        egui::CollapsingHeader::new("Light")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Color");
                    let mut rgb = light.color.to_array();
                    if ui.color_edit_button_rgb(&mut rgb).changed() {
                        light.color = Vec3::from(rgb);
                        changed = true;
                    }
                });
                let mut intensity = light.intensity;
                if float_row(ui, "Intensity", &mut intensity, 0.1, 0.0..=10.0) {
                    light.set_intensity(intensity);
                    changed = true;
                }

                match &mut light.kind {
                    LightKind::Point(point) => {
                        let mut radius = point.radius();
                        if float_row(ui, "Radius", &mut radius, 0.1, POINT_RADIUS_RANGE) {
                            point.set_radius(radius);
                            changed = true;
                        }
                        ui.label(format!("Linear: {:.6}", point.linear()));
                        ui.label(format!("Quadratic: {:.6}", point.quadratic()));
                    }
                    LightKind::Directional(directional) => {
                        changed |= float_row(ui, "Size", &mut directional.size, 0.05, 0.001..=100.0);
                        changed |= float_row(ui, "Near plane", &mut directional.near, 0.1, -500.0..=500.0);
                        changed |= float_row(ui, "Far plane", &mut directional.far, 1.0, 5.0..=500.0);
                        changed |= float_row(ui, "Offset", &mut directional.offset, 0.1, 0.0..=200.0);

                        ui.horizontal(|ui| {
                            ui.label("Shadow map");
                            let before = directional.resolution;
                            egui::ComboBox::from_id_salt("shadow_resolution")
                                .selected_text(before.to_string())
                                .show_ui(ui, |ui| {
                                    for resolution in ShadowResolution::ALL {
                                        ui.selectable_value(
                                            &mut directional.resolution,
                                            resolution,
                                            resolution.to_string(),
                                        );
                                    }
                                });
                            changed |= directional.resolution != before;
                        });
                        changed |= ui.checkbox(&mut directional.soft, "Soft shadows").changed();
                    }
                }
            });
        drop(light);

        if self
            .scene
            .try_component::<Light>(entity)
            .is_ok_and(|light| light.as_directional().is_some())
            && self.scene.directional_light() != Some(entity)
        {
            if ui.button("Use as shadow caster").clicked() {
                if let Err(err) = self.scene.set_directional_light(Some(entity)) {
                    log::warn!("{err}");
                }
                changed = true;
            }
        }
        changed
    }

    fn material_panel(&mut self, ui: &mut egui::Ui, entity: Entity) {
        let Ok(mut mesh) = self.scene.try_component_mut::<MeshComponent>(entity) else {
            return;
        };
        egui::CollapsingHeader::new("Material")
            .default_open(true)
            .show(ui, |ui| {
                ui.label("Flat Color");
                let material = &mut mesh.material;
                ui.horizontal(|ui| {
                    ui.label("Color");
                    let mut rgb = material.diffuse.to_array();
                    if ui.color_edit_button_rgb(&mut rgb).changed() {
                        material.diffuse = Vec3::from(rgb);
                        material.update_diffuse();
                    }
                });
                if float_row(ui, "Roughness", &mut material.roughness, 0.005, 0.0..=1.0) {
                    material.update_roughness();
                }
                ui.label(format!("Shininess: {:.3}", material.shininess()));
            });
    }

    fn performance_panel(&self, ui: &mut egui::Ui, renderer: &dyn SceneRenderer) {
        egui::CollapsingHeader::new("Performance")
            .default_open(true)
            .show(ui, |ui| {
                ui.label(format!("FPS: {:.1}", self.fps));
                ui.label(format!("Entities: {}", self.scene.len()));
                let (width, height) = renderer.viewport_size();
                ui.label(format!("Viewport: {width}x{height}"));
                ui.label(format!("Shadow map: {}", renderer.shadow_map_size()));
            });
    }

    fn particle_panels(&mut self, ui: &mut egui::Ui) {
        let mut remove = None;
        for (index, system) in self.scene.particle_systems_mut().iter_mut().enumerate() {
            egui::CollapsingHeader::new(system.label().to_owned())
                .id_salt(("particles", index))
                .show(ui, |ui| {
                    bridge::show(ui, system);
                    ui.label(format!("Live particles: {}", system.particles().len()));
                    if ui.button("Remove").clicked() {
                        remove = Some(index);
                    }
                });
        }
        if let Some(index) = remove {
            self.scene.remove_particle_system_at(index);
        }
        if ui.button("Add particle system").clicked() {
            self.scene.add_particle_system();
        }
    }
}

fn bridge_panel(ui: &mut egui::Ui, bridge: &mut dyn Bridge) {
    egui::CollapsingHeader::new(bridge.label().to_owned())
        .default_open(false)
        .show(ui, |ui| {
            if bridge::show(ui, bridge) {
                log::trace!("{} settings changed", bridge.label());
            }
        });
}
