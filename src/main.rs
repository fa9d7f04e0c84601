use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use slopefinder::favorites::{InMemoryFavoritesRemote, JsonFileFavoritesRemote};
use slopefinder::filter::PriceRange;
use slopefinder::map::{RecordingSurface, empty_region_shapes};
use slopefinder::{
    Amenity, CachedGeocoder, DifficultyTier, Discovery, FavoritesRemote, FavoritesStore,
    GeocodeCache, OpenMeteoGeocoder, PreferencePayload, Region, ResortFeed, SlopeFinderConfig,
    geo, source, telemetry,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Resort collection as JSON (array or object keyed by id)
    resorts: PathBuf,

    /// Only resorts near this place (geocoded)
    #[arg(long)]
    near: Option<String>,

    /// Search radius in miles for --near
    #[arg(long)]
    radius: Option<f64>,

    /// Difficulty tier to require, repeatable (any matches)
    #[arg(long = "difficulty")]
    difficulties: Vec<DifficultyTier>,

    /// Amenity to require, repeatable (all must match)
    #[arg(long = "amenity")]
    amenities: Vec<Amenity>,

    #[arg(long)]
    region: Option<Region>,

    /// Highest full-day ticket price in dollars
    #[arg(long)]
    price_max: Option<f64>,

    /// Quiz answers to apply first, as JSON
    #[arg(long)]
    quiz: Option<PathBuf>,

    /// User whose favorites are loaded
    #[arg(long, env = "SLOPEFINDER_USER")]
    user: Option<String>,

    /// JSON file holding favorites per user
    #[arg(long)]
    favorites_file: Option<PathBuf>,

    /// Only show the user's favorites
    #[arg(long)]
    favorites_only: bool,

    /// GeoJSON region outlines for the map overlay
    #[arg(long)]
    regions: Option<PathBuf>,

    /// Path to a configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = SlopeFinderConfig::load_from_path(cli.config.clone())?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    telemetry::init(&config.logging)?;

    let feed = ResortFeed::new();
    feed.publish(source::load_resorts_from_json(&cli.resorts).await?);

    let remote: Arc<dyn FavoritesRemote> = match &cli.favorites_file {
        Some(path) => Arc::new(JsonFileFavoritesRemote::new(path)),
        None => Arc::new(InMemoryFavoritesRemote::new()),
    };

    let region_shapes = match &cli.regions {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read region outlines: {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| "Region outlines are not valid JSON")?
        }
        None => empty_region_shapes(),
    };

    let mut discovery: Discovery<RecordingSurface> =
        Discovery::new(&config, FavoritesStore::new(remote), region_shapes);
    discovery.connect(&feed);
    discovery.attach_map(RecordingSurface::new());
    discovery.map_ready();

    if let Some(user) = &cli.user {
        if let Err(e) = discovery.sign_in(user).await {
            warn!("{}", e.user_message());
        }
    }

    let cache = GeocodeCache::open(
        config.geocoding.cache_dir(),
        Duration::from_secs(u64::from(config.geocoding.cache_ttl_hours) * 3600),
    )?;
    let geocoder = CachedGeocoder::new(OpenMeteoGeocoder::new(&config.geocoding)?, cache);

    if let Some(path) = &cli.quiz {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read quiz answers: {}", path.display()))?;
        let payload: PreferencePayload =
            serde_json::from_str(&text).with_context(|| "Quiz answers are not valid JSON")?;
        let outcome = discovery.enter(Some(payload));
        if let Some(dismissal) = outcome.dismissal {
            discovery.apply_dismissal(&dismissal);
        }
        if let Some(address) = outcome.geocode {
            if let Err(e) = discovery.set_location(&address, &geocoder).await {
                warn!("{}", e.user_message());
            }
        }
    }

    let price_max = cli.price_max;
    let radius = cli.radius;
    let region = cli.region;
    let favorites_only = cli.favorites_only;
    discovery.update_state(|state| {
        state.difficulties.extend(cli.difficulties.iter().copied());
        state.amenities.extend(cli.amenities.iter().copied());
        if region.is_some() {
            state.region = region;
        }
        if let Some(max) = price_max {
            state.price = PriceRange::new(state.price.min, max);
        }
        if let Some(radius) = radius {
            state.distance.radius_miles = Some(radius);
        }
        state.favorites_active |= favorites_only;
    });

    if let Some(near) = &cli.near {
        if let Err(e) = discovery.set_location(near, &geocoder).await {
            println!("{}", e.user_message());
        }
    }

    if discovery.shows_no_favorites_notice() {
        println!("No favorites yet. Toggle a resort's heart to add it.");
        return Ok(());
    }

    let anchor = discovery.state().distance.active().map(|query| query.anchor);
    let filtered = discovery.filtered();
    info!(
        overlays = discovery.map().viewport().overlays.len(),
        "Filtering finished"
    );
    println!("{} resorts match:", filtered.len());
    for resort in filtered.iter() {
        let distance = anchor
            .zip(resort.coordinate())
            .map(|(from, to)| format!(" ({:.1} mi)", geo::distance_miles(&from, &to)))
            .unwrap_or_default();
        let marker = if discovery.favorites().is_favorite(&resort.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {} [{}] {}{}",
            resort.name,
            if resort.region.is_empty() { "-" } else { resort.region.as_str() },
            resort.full_day_ticket,
            distance
        );
    }

    if let Some(map) = discovery.detach_map() {
        info!("Map surface released after {} calls", map.calls().len());
    }
    Ok(())
}
