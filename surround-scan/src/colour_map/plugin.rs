/// Request-driven bake passes running on the thread that owns rendering
use super::bake::{BakeExecutor, BakeSettle, RenderBackend};
use super::cache::{BakeReport, BakedColourMaps, gather_mesh_material_combos};
use crate::config::SurroundScanConfig;
use bevy::app::AppExit;
use bevy::prelude::*;

/// Runs on the owning thread once the pass has finished.
pub type BakeCallback = Box<dyn FnOnce(&mut World) + Send + Sync>;

/// Ask for every (mesh, material) pair in the world to be baked or loaded.
#[derive(Event)]
pub struct BakeMapsRequest {
    pub map_name: String,
    pub on_complete: Option<BakeCallback>,
}

impl BakeMapsRequest {
    pub fn new(map_name: impl Into<String>) -> Self {
        Self {
            map_name: map_name.into(),
            on_complete: None,
        }
    }

    pub fn then(mut self, on_complete: impl FnOnce(&mut World) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(on_complete));
        self
    }
}

/// Empty the colour table and release the bake rig.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct ClearColourMaps;

#[derive(Event, Debug, Clone)]
pub struct ColourMapsBaked {
    pub map_name: String,
    pub report: BakeReport,
}

pub struct ColourMapPlugin;

impl Plugin for ColourMapPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SurroundScanConfig>();
        let resolution = app.world().resource::<SurroundScanConfig>().bake.resolution;

        app.insert_resource(BakedColourMaps::new(resolution))
            .add_event::<BakeMapsRequest>()
            .add_event::<ClearColourMaps>()
            .add_event::<ColourMapsBaked>()
            .add_systems(Update, process_colour_map_requests)
            .add_systems(Last, release_on_exit);
    }
}

/// Install the rendering host used for bakes, with settle times from the
/// world's config.
pub fn insert_bake_backend(world: &mut World, backend: Box<dyn RenderBackend>) {
    let settle = world
        .get_resource::<SurroundScanConfig>()
        .map(|config| BakeSettle {
            before_capture: config.bake.settle_before_capture(),
            after_capture: config.bake.settle_after_capture(),
        })
        .unwrap_or_default();
    world.insert_non_send_resource(BakeExecutor::new(backend).with_settle(settle));
}

/// Handle pending clears, then every pending bake request in arrival order.
pub fn process_colour_map_requests(world: &mut World) {
    let clears = world
        .resource_mut::<Events<ClearColourMaps>>()
        .drain()
        .count();
    let requests: Vec<BakeMapsRequest> = world
        .resource_mut::<Events<BakeMapsRequest>>()
        .drain()
        .collect();

    let Some(cache) = world.get_resource::<BakedColourMaps>().cloned() else {
        if clears + requests.len() > 0 {
            warn!("Colour map requests ignored after teardown");
        }
        return;
    };

    if clears > 0 {
        cache.clear();
        if let Some(mut executor) = world.get_non_send_resource_mut::<BakeExecutor>() {
            executor.release();
        }
        info!("Cleared baked colour maps");
    }

    for request in requests {
        let combinations = gather_mesh_material_combos(world);
        let layout = world.resource::<SurroundScanConfig>().layout();

        let mut executor = world.remove_non_send_resource::<BakeExecutor>();
        let report = cache.ensure_baked(
            &layout,
            &request.map_name,
            &combinations,
            executor.as_mut(),
        );
        if let Some(mut executor) = executor {
            executor.release();
            world.insert_non_send_resource(executor);
        }

        info!(
            "Colour maps for {}: {} cached, {} loaded, {} baked, {} failed",
            request.map_name, report.cached, report.loaded, report.baked, report.failed
        );
        world.send_event(ColourMapsBaked {
            map_name: request.map_name,
            report,
        });

        if let Some(on_complete) = request.on_complete {
            on_complete(world);
        }
    }
}

/// Drop the colour table and every rendering resource the bake rig holds.
pub fn teardown_colour_maps(world: &mut World) {
    if let Some(cache) = world.remove_resource::<BakedColourMaps>() {
        // Readers handed to worker threads share the table.
        cache.clear();
    }
    if let Some(mut executor) = world.remove_non_send_resource::<BakeExecutor>() {
        executor.release();
    }
}

fn release_on_exit(world: &mut World) {
    let exiting = world
        .get_resource::<Events<AppExit>>()
        .is_some_and(|events| !events.is_empty());
    if exiting {
        teardown_colour_maps(world);
    }
}
