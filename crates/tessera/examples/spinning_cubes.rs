//! Spinning cubes: a headless frame loop.
//!
//! A 3×3 grid of cubes spins under an orbiting camera. A few of them carry a
//! lifetime and are removed when it runs out. Nothing is drawn; the "render"
//! system computes every model-view-projection matrix and logs a summary.
//!
//! Run with `RUST_LOG=info cargo run --example spinning_cubes`.

use std::time::Duration;

use log::{debug, info};
use tessera::prelude::*;

const FRAMES: u64 = 300;
const STEP: Duration = Duration::from_micros(16_667);

// ── Components ──────────────────────────────────────────────────────────

struct Mesh {
    name: &'static str,
    vertices: u32,
}

impl Mesh {
    fn cube() -> Self {
        Self {
            name: "cube",
            vertices: 36,
        }
    }
}

struct Camera {
    fov_y: f32,
    aspect: f32,
    view_proj: Mat4,
}

/// Angular speed about Y, in radians per second.
struct Spin(f32);

/// Seconds left before the entity is removed.
struct Lifetime(f32);

fn main() -> tessera::Result<()> {
    env_logger::init();

    let config = EngineConfig {
        initial_capacity: 16,
        ..EngineConfig::default()
    };
    let mut engine = Engine::with_config(config);
    setup(&mut engine)?;

    engine.add_system(spin);
    engine.add_system(CameraController {
        radius: 12.0,
        height: 5.0,
        speed: 0.4,
        angle: 0.0,
    });
    engine.add_system(Expire::default());
    engine.add_system(Renderer::default());

    let mut time = Time::new();
    while time.frame_count() < FRAMES {
        engine.run(time.step(STEP));

        if time.frame_count() % 60 == 0 {
            info!(
                "t={:.1}s, {} entities",
                time.elapsed_secs(),
                engine.entity_count()
            );
            log_diagnostics(&engine);
        }
    }
    Ok(())
}

fn setup(engine: &mut Engine) -> tessera::Result<()> {
    engine.create_entity((
        Transform::from_xyz(0.0, 5.0, 12.0),
        Camera {
            fov_y: 60f32.to_radians(),
            aspect: 16.0 / 9.0,
            view_proj: Mat4::IDENTITY,
        },
    ))?;

    for row in 0..3 {
        for col in 0..3 {
            let x = (col as f32 - 1.0) * 3.0;
            let z = (row as f32 - 1.0) * 3.0;
            let speed = 0.5 + (row * 3 + col) as f32 * 0.25;
            let cube = engine.create_entity((
                Mesh::cube(),
                Transform::from_xyz(x, 0.0, z).with_scale(0.8),
                Spin(speed),
            ))?;
            // The corners fade out after a couple of seconds.
            if row != 1 && col != 1 {
                engine.add_component(&cube, Lifetime(1.0 + row as f32 + col as f32 * 0.5))?;
            }
        }
    }
    info!("setup: {} entities", engine.entity_count());
    Ok(())
}

// ── Systems ─────────────────────────────────────────────────────────────

fn spin(engine: &mut Engine, delta: f32) {
    for m in engine.find_entities_with::<(&mut Transform, &Spin)>() {
        let (transform, spin) = m.components;
        transform.rotate_y(spin.0 * delta);
    }
}

/// Orbits the camera around the origin and refreshes its view-projection.
struct CameraController {
    radius: f32,
    height: f32,
    speed: f32,
    angle: f32,
}

impl System for CameraController {
    fn run(&mut self, engine: &mut Engine, delta: f32) {
        self.angle += self.speed * delta;
        let eye = Vec3::new(
            self.radius * self.angle.sin(),
            self.height,
            self.radius * self.angle.cos(),
        );

        if let Some(m) = engine.query_single::<(&mut Camera, &mut Transform)>() {
            let (camera, transform) = m.components;
            transform.translation = eye;
            let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
            let proj = Mat4::perspective_rh(camera.fov_y, camera.aspect, 0.1, 100.0);
            camera.view_proj = proj * view;
        }
    }
}

/// Counts lifetimes down and removes expired entities after the tick.
#[derive(Default)]
struct Expire {
    expired: Vec<Entity>,
}

impl System for Expire {
    fn run(&mut self, engine: &mut Engine, delta: f32) {
        for m in engine.find_entities_with::<&mut Lifetime>() {
            m.components.0 -= delta;
            if m.components.0 <= 0.0 {
                self.expired.push(m.entity.clone());
            }
        }
        for entity in self.expired.drain(..) {
            debug!("expiring {entity:?}");
            engine.defer_delete(&entity);
        }
    }
}

/// Stand-in for a renderer: builds the MVP of every visible mesh.
#[derive(Default)]
struct Renderer {
    frame: u64,
}

impl System for Renderer {
    fn run(&mut self, engine: &mut Engine, _delta: f32) {
        self.frame += 1;

        // Copy the camera out before opening the mesh query.
        let Some(view_proj) = engine
            .query_single::<&Camera>()
            .map(|m| m.components.view_proj)
        else {
            return;
        };

        let mut draws = 0;
        let mut vertices = 0;
        let mut centroid = Vec3::ZERO;
        for m in engine.find_entities_with::<(&Mesh, &Transform)>() {
            let (mesh, transform) = m.components;
            let mvp = view_proj * transform.matrix();
            centroid += mvp.project_point3(Vec3::ZERO);
            draws += 1;
            vertices += mesh.vertices;
            if self.frame == 1 {
                debug!("draw {} {:?}", mesh.name, m.entity);
            }
        }

        if self.frame % 60 == 0 && draws > 0 {
            debug!(
                "frame {}: {draws} draws, {vertices} vertices, ndc centroid {:?}",
                self.frame,
                centroid / draws as f32
            );
        }
    }
}

fn log_diagnostics(engine: &Engine) {
    let snapshot = engine.diagnostics();
    match snapshot.to_json() {
        Ok(json) => info!("diag: {json}"),
        Err(e) => log::warn!("diag serialization failed: {e}"),
    }
}
