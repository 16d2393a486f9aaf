//! Marker Review
//!
//! Prints the markers a JSON store holds for a video, in display order.
//!
//! ```text
//! marker-review <store.json>              list videos with markers
//! marker-review <store.json> <video-id>   list one video's markers
//! ```
//!
//! Editor settings are read from `editor.json` next to the store file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use marker_review::core::{JsonMarkerStore, MarkerStore};
use marker_review::state::EditorSettings;
use marker_review::utils::format_timecode;
use marker_review::{MarkerEditor, Result};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const USAGE: &str = "usage: marker-review <store.json> [video-id]";

#[tokio::main]
async fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next().map(PathBuf::from) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    let video_id = args.next();
    if args.next().is_some() {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    }

    let store = Arc::new(JsonMarkerStore::new(path));
    let result = match video_id {
        Some(raw) => list_markers(Arc::clone(&store), &raw).await,
        None => list_videos(&store).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(path = %store.path().display(), "{err}");
            eprintln!("marker-review: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn list_videos(store: &JsonMarkerStore) -> Result<()> {
    for video_id in store.video_ids().await? {
        let count = store.list(video_id).await?.len();
        println!("{video_id}  {count} marker(s)");
    }
    Ok(())
}

async fn list_markers(store: Arc<JsonMarkerStore>, raw_id: &str) -> Result<()> {
    let video_id = Uuid::parse_str(raw_id.trim())?;
    let settings = EditorSettings::load(settings_folder(store.path())).await?;
    debug!(?settings, "editor settings");

    let (editor, _failures) = MarkerEditor::open(video_id, store, None, settings).await?;
    let markers = editor.markers();
    if markers.is_empty() {
        println!("no markers for {video_id}");
        return Ok(());
    }
    for marker in &markers {
        println!(
            "{:>12}  {}  {}",
            format_timecode(marker.time),
            marker.id,
            marker.display_label()
        );
    }
    Ok(())
}

fn settings_folder(store_path: &Path) -> &Path {
    store_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}
