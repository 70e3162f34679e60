// Ports - Interface definitions (contracts)

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::MoshResult;
use crate::scenes::SceneChange;

/// Port for scene change detection
#[async_trait]
pub trait ScenePort: Send + Sync {
    /// Detect scene changes in `input` at the given similarity threshold
    ///
    /// Scene changes are sent on `scenes` as they are found and the
    /// processed fraction of the input on `progress`. Both channels close when
    /// the call returns. Cancellation stops detection and returns `Ok`.
    async fn detect_scenes(
        &self,
        input: &Path,
        threshold: f64,
        scenes: mpsc::Sender<SceneChange>,
        progress: mpsc::Sender<f64>,
        cancel: CancellationToken,
    ) -> MoshResult<()>;
}

/// Run scene detection and collect every scene change
///
/// `on_progress` sees each progress fraction as it arrives.
pub async fn collect_scenes<P, F>(
    port: &P,
    input: &Path,
    threshold: f64,
    cancel: CancellationToken,
    mut on_progress: F,
) -> MoshResult<Vec<SceneChange>>
where
    P: ScenePort + ?Sized,
    F: FnMut(f64),
{
    let (scene_tx, mut scene_rx) = mpsc::channel(64);
    let (progress_tx, mut progress_rx) = mpsc::channel(16);

    let detect = port.detect_scenes(input, threshold, scene_tx, progress_tx, cancel);
    let drain = async {
        let mut scenes = Vec::new();
        loop {
            tokio::select! {
                Some(scene) = scene_rx.recv() => scenes.push(scene),
                Some(fraction) = progress_rx.recv() => on_progress(fraction),
                else => break,
            }
        }
        scenes
    };

    let (result, scenes) = tokio::join!(detect, drain);
    result.map(|_| scenes)
}
