//! CPU particle emitters owned by the scene.

use glam::Vec3;

/// Tunable emitter values, edited through the property bridge.
#[derive(Clone, Debug, PartialEq)]
pub struct EmitterSettings {
    pub enabled: bool,
    pub origin: Vec3,
    /// Particles spawned per second.
    pub rate: f32,
    /// Seconds each particle lives.
    pub lifetime: f32,
    /// Initial speed along the emit cone.
    pub speed: f32,
    /// Half-angle of the emit cone around +Y, in degrees.
    pub spread: f32,
    /// Downward acceleration.
    pub gravity: f32,
    /// Edge length of the cube drawn for each particle.
    pub size: f32,
    pub start_color: Vec3,
    pub end_color: Vec3,
    pub max_particles: usize,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            origin: Vec3::new(0.0, 1.0, 0.0),
            rate: 40.0,
            lifetime: 2.0,
            speed: 4.0,
            spread: 20.0,
            gravity: 9.81,
            size: 0.1,
            start_color: Vec3::new(1.0, 0.8, 0.3),
            end_color: Vec3::new(0.8, 0.1, 0.05),
            max_particles: 1024,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub age: f32,
    pub lifetime: f32,
}

impl Particle {
    /// `0.0` when spawned, `1.0` when it dies.
    pub fn progress(&self) -> f32 {
        (self.age / self.lifetime).clamp(0.0, 1.0)
    }
}

/// A named emitter and its live particles.
#[derive(Clone, Debug)]
pub struct ParticleSystem {
    pub name: String,
    pub settings: EmitterSettings,
    particles: Vec<Particle>,
    spawn_debt: f32,
    rng: u32,
}

impl ParticleSystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, EmitterSettings::default())
    }

    pub fn with_settings(name: impl Into<String>, settings: EmitterSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            particles: Vec::new(),
            spawn_debt: 0.0,
            rng: 0x9E37_79B9,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Color of a particle at its current age.
    pub fn color_of(&self, particle: &Particle) -> Vec3 {
        self.settings
            .start_color
            .lerp(self.settings.end_color, particle.progress())
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.spawn_debt = 0.0;
    }

    /// Age, integrate and cull existing particles, then spawn new ones.
    pub fn update(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        let gravity = Vec3::NEG_Y * self.settings.gravity;
        for particle in &mut self.particles {
            particle.age += dt;
            particle.velocity += gravity * dt;
            particle.position += particle.velocity * dt;
        }
        self.particles.retain(|p| p.age < p.lifetime);

        if !self.settings.enabled || self.settings.lifetime <= 0.0 {
            self.spawn_debt = 0.0;
            return;
        }

        self.spawn_debt += self.settings.rate.max(0.0) * dt;
        while self.spawn_debt >= 1.0 {
            self.spawn_debt -= 1.0;
            if self.particles.len() >= self.settings.max_particles {
                continue;
            }
            let direction = self.random_direction();
            self.particles.push(Particle {
                position: self.settings.origin,
                velocity: direction * self.settings.speed,
                age: 0.0,
                lifetime: self.settings.lifetime,
            });
        }
    }

    fn random_direction(&mut self) -> Vec3 {
        let spread = self.settings.spread.clamp(0.0, 180.0).to_radians();
        let cos_max = spread.cos();
        let cos_theta = 1.0 - self.next_unit() * (1.0 - cos_max);
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let phi = self.next_unit() * std::f32::consts::TAU;
        Vec3::new(sin_theta * phi.cos(), cos_theta, sin_theta * phi.sin())
    }

    // xorshift32, deterministic per system.
    fn next_unit(&mut self) -> f32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        (x >> 8) as f32 / (1u32 << 24) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawns_at_configured_rate() {
        let mut system = ParticleSystem::new("Sparks");
        system.settings.rate = 10.0;
        system.update(0.5);
        assert_eq!(system.particles().len(), 5);
    }

    #[test]
    fn particles_expire_after_lifetime() {
        let mut system = ParticleSystem::new("Sparks");
        system.settings.rate = 10.0;
        system.settings.lifetime = 0.25;
        system.update(0.2);
        system.settings.enabled = false;
        system.update(0.1);
        assert!(system.particles().is_empty());
    }

    #[test]
    fn respects_particle_cap() {
        let mut system = ParticleSystem::new("Sparks");
        system.settings.rate = 1000.0;
        system.settings.max_particles = 8;
        system.update(1.0);
        assert_eq!(system.particles().len(), 8);
    }

    #[test]
    fn emit_cone_points_up() {
        let mut system = ParticleSystem::new("Sparks");
        system.settings.spread = 10.0;
        system.settings.gravity = 0.0;
        system.update(1.0);
        assert!(system.particles().iter().all(|p| p.velocity.y > 0.0));
    }

    #[test]
    fn color_interpolates_over_lifetime() {
        let system = ParticleSystem::new("Sparks");
        let particle = Particle {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            age: 2.0,
            lifetime: 2.0,
        };
        assert_eq!(system.color_of(&particle), system.settings.end_color);
    }
}
