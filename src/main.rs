//! Star Map Poster entry point
//!
//! On the web this boots the poster preview page. Natively it lays out a
//! sample poster and logs the geometry.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

    log::info!("Star Map Poster starting...");
    if let Err(err) = starmap_poster::web::start().await {
        log::error!("Poster preview failed to start: {:?}", err);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use starmap_poster::geometry::PosterLayout;
    use starmap_poster::pipeline::{Pipeline, PosterState};
    use starmap_poster::storage::MemoryStore;
    use starmap_poster::{PosterSettings, UserId};

    env_logger::init();
    log::info!("Star Map Poster (native) starting...");
    log::info!("The preview page is web-only - run with `trunk serve` for the browser build");

    let store = MemoryStore::new();
    let user = UserId::guest();
    let pipeline = Pipeline::standard();

    for combined_view in [false, true] {
        let settings = PosterSettings {
            combined_view,
            ..PosterSettings::load(&store, &user)
        };
        let state = pipeline.run(PosterState::new(settings, 1200.0, 1600.0));
        match state.layout {
            Some(PosterLayout::Single(c)) => println!(
                "single: center ({:.1}, {:.1}) radius {:.1}",
                c.center_x, c.center_y, c.radius
            ),
            Some(PosterLayout::Combined(layout)) => {
                for (name, c) in [("first", layout.first), ("second", layout.second)] {
                    println!(
                        "combined {:?} {name}: center ({:.1}, {:.1}) radius {:.1}",
                        layout.orientation, c.center_x, c.center_y, c.radius
                    );
                }
            }
            None => println!("no layout"),
        }
    }
}
