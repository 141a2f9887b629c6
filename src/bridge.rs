//! Property panels that render without knowing the subsystem they edit.
//!
//! A [`Bridge`] hands out an ordered list of [`Parameter`]s, each borrowing one
//! field of the subsystem. The editor calls [`Parameter::render`] on every one
//! and only learns whether something changed.
//!
//! ```ignore
//! egui::Window::new(settings.label()).show(ctx, |ui| {
//!     if bridge::show(ui, &mut settings) {
//!         log::debug!("renderer settings changed");
//!     }
//! });
//! ```

use std::ops::RangeInclusive;

use glam::Vec3;

use crate::render::{PcfKernel, RendererSettings, ShadowSettings};
use crate::scene::ParticleSystem;

/// A field with a fixed list of named options.
pub trait Choose {
    fn labels(&self) -> Vec<String>;
    fn index(&self) -> usize;
    fn set_index(&mut self, index: usize);
}

impl Choose for PcfKernel {
    fn labels(&self) -> Vec<String> {
        PcfKernel::ALL.iter().map(ToString::to_string).collect()
    }

    fn index(&self) -> usize {
        PcfKernel::ALL.iter().position(|k| k == self).unwrap_or(0)
    }

    fn set_index(&mut self, index: usize) {
        if let Some(kernel) = PcfKernel::ALL.get(index) {
            *self = *kernel;
        }
    }
}

/// Borrowed value of a single parameter plus how to edit it.
pub enum ParamValue<'a> {
    Float {
        value: &'a mut f32,
        range: RangeInclusive<f32>,
        speed: f32,
    },
    Count {
        value: &'a mut usize,
        range: RangeInclusive<usize>,
    },
    Vector {
        value: &'a mut Vec3,
        speed: f32,
    },
    Color(&'a mut [f32; 3]),
    Toggle(&'a mut bool),
    Choice(&'a mut dyn Choose),
}

pub struct Parameter<'a> {
    pub name: &'static str,
    pub value: ParamValue<'a>,
}

impl<'a> Parameter<'a> {
    pub fn new(name: &'static str, value: ParamValue<'a>) -> Self {
        Self { name, value }
    }

    pub fn float(name: &'static str, value: &'a mut f32, range: RangeInclusive<f32>) -> Self {
        let speed = ((range.end() - range.start()) / 200.0).max(0.001);
        Self::new(name, ParamValue::Float { value, range, speed })
    }

    pub fn color(name: &'static str, value: &'a mut [f32; 3]) -> Self {
        Self::new(name, ParamValue::Color(value))
    }

    pub fn toggle(name: &'static str, value: &'a mut bool) -> Self {
        Self::new(name, ParamValue::Toggle(value))
    }

    /// Draw the widget for this parameter. Returns true if the value changed.
    pub fn render(&mut self, ui: &mut egui::Ui) -> bool {
        let name = self.name;
        ui.horizontal(|ui| {
            ui.label(name);
            match &mut self.value {
                ParamValue::Float { value, range, speed } => ui
                    .add(
                        egui::DragValue::new(&mut **value)
                            .range(range.clone())
                            .speed(*speed),
                    )
                    .changed(),
                ParamValue::Count { value, range } => ui
                    .add(egui::DragValue::new(&mut **value).range(range.clone()))
                    .changed(),
                ParamValue::Vector { value, speed } => {
                    let mut changed = false;
                    for component in [&mut value.x, &mut value.y, &mut value.z] {
                        changed |= ui
                            .add(egui::DragValue::new(component).speed(*speed))
                            .changed();
                    }
                    changed
                }
                ParamValue::Color(rgb) => ui.color_edit_button_rgb(rgb).changed(),
                ParamValue::Toggle(flag) => ui.checkbox(flag, "").changed(),
                ParamValue::Choice(choice) => {
                    let labels = choice.labels();
                    let mut index = choice.index();
                    let selected = labels.get(index).cloned().unwrap_or_default();
                    egui::ComboBox::from_id_salt(name)
                        .selected_text(selected)
                        .show_ui(ui, |ui| {
                            for (i, label) in labels.iter().enumerate() {
                                ui.selectable_value(&mut index, i, label.as_str());
                            }
                        });
                    if index != choice.index() {
                        choice.set_index(index);
                        true
                    } else {
                        false
                    }
                }
            }
        })
        .inner
    }
}

/// A subsystem whose tunables are shown as a generic property panel.
pub trait Bridge {
    /// Panel title.
    fn label(&self) -> &str;

    /// Every editable field, in display order.
    fn parameters(&mut self) -> Vec<Parameter<'_>>;
}

/// Render all parameters of `bridge`. Returns true if any of them changed.
pub fn show(ui: &mut egui::Ui, bridge: &mut dyn Bridge) -> bool {
    let mut changed = false;
    for mut parameter in bridge.parameters() {
        changed |= parameter.render(ui);
    }
    changed
}

impl Bridge for RendererSettings {
    fn label(&self) -> &str {
        "Renderer"
    }

    fn parameters(&mut self) -> Vec<Parameter<'_>> {
        vec![
            Parameter::color("Clear color", &mut self.clear_color),
            Parameter::float("Ambient", &mut self.ambient, 0.0..=1.0),
            Parameter::toggle("Light markers", &mut self.show_light_markers),
            Parameter::toggle("Particles", &mut self.show_particles),
            Parameter::toggle("Outline selection", &mut self.outline_selection),
            Parameter::color("Outline color", &mut self.outline_color),
            Parameter::float("Outline scale", &mut self.outline_scale, 1.0..=1.2),
        ]
    }
}

impl Bridge for ShadowSettings {
    fn label(&self) -> &str {
        "Shadows"
    }

    fn parameters(&mut self) -> Vec<Parameter<'_>> {
        vec![
            Parameter::toggle("Enabled", &mut self.enabled),
            Parameter::float("Bias", &mut self.bias, 0.0..=0.05),
            Parameter::float("Normal bias", &mut self.normal_bias, 0.0..=0.5),
            Parameter::new("PCF kernel", ParamValue::Choice(&mut self.kernel)),
        ]
    }
}

impl Bridge for ParticleSystem {
    fn label(&self) -> &str {
        &self.name
    }

    fn parameters(&mut self) -> Vec<Parameter<'_>> {
        let settings = &mut self.settings;
        vec![
            Parameter::toggle("Enabled", &mut settings.enabled),
            Parameter::new(
                "Origin",
                ParamValue::Vector {
                    value: &mut settings.origin,
                    speed: 0.05,
                },
            ),
            Parameter::float("Rate", &mut settings.rate, 0.0..=500.0),
            Parameter::float("Lifetime", &mut settings.lifetime, 0.05..=20.0),
            Parameter::float("Speed", &mut settings.speed, 0.0..=50.0),
            Parameter::float("Spread", &mut settings.spread, 0.0..=180.0),
            Parameter::float("Gravity", &mut settings.gravity, -20.0..=20.0),
            Parameter::float("Size", &mut settings.size, 0.01..=2.0),
            Parameter::new("Start color", ParamValue::Color(settings.start_color.as_mut())),
            Parameter::new("End color", ParamValue::Color(settings.end_color.as_mut())),
            Parameter::new(
                "Max particles",
                ParamValue::Count {
                    value: &mut settings.max_particles,
                    range: 1..=16384,
                },
            ),
        ]
    }
}
