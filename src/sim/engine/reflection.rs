use rand::Rng;

use crate::Vector;

/// Defines how rays reflect off surfaces.
///
/// Models draw their randomness from the caller's generator so that a seeded
/// run is reproducible.
pub trait ReflectionModel {
    /// Computes the reflected direction given incident direction and surface normal.
    fn reflect<R: Rng>(&self, incident: Vector, normal: Vector, rng: &mut R) -> Vector;
}

/// Perfect specular (mirror) reflection.
pub struct Specular;

impl ReflectionModel for Specular {
    fn reflect<R: Rng>(&self, incident: Vector, normal: Vector, _rng: &mut R) -> Vector {
        incident.reflect(normal)
    }
}

/// Lambertian diffuse reflection (cosine-weighted hemisphere sampling via Malley's method).
pub struct Diffuse;

impl ReflectionModel for Diffuse {
    fn reflect<R: Rng>(&self, incident: Vector, normal: Vector, rng: &mut R) -> Vector {
        // The outgoing hemisphere is the one the ray came from
        let n = if incident.dot(normal) >= 0.0 {
            -normal
        } else {
            normal
        };
        let tangent = n.any_orthogonal();
        let bitangent = n.cross(tangent);

        // Uniform on the unit disk, projected up onto the hemisphere
        let u1: f64 = rng.r#gen();
        let u2: f64 = rng.r#gen();
        let r = u1.sqrt();
        let phi = 2.0 * std::f64::consts::PI * u2;
        let z = (1.0 - u1).sqrt();

        tangent * (r * phi.cos()) + bitangent * (r * phi.sin()) + n * z
    }
}

/// Mix of specular and diffuse reflection driven by a scattering coefficient.
pub struct Hybrid {
    /// 0 = pure specular, 1 = pure diffuse.
    pub scattering: f64,
}

impl Hybrid {
    pub fn new(scattering: f64) -> Self {
        Self {
            scattering: scattering.clamp(0.0, 1.0),
        }
    }
}

impl ReflectionModel for Hybrid {
    fn reflect<R: Rng>(&self, incident: Vector, normal: Vector, rng: &mut R) -> Vector {
        if rng.r#gen::<f64>() < self.scattering {
            Diffuse.reflect(incident, normal, rng)
        } else {
            Specular.reflect(incident, normal, rng)
        }
    }
}
