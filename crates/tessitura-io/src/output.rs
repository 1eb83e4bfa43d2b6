//! Hosting the renderer in an output stream.

use tessitura_synth::RenderGraph;

use crate::backend::{AudioBackend, OutputConfig, StreamHandle};
use crate::{Error, Result};

/// Starts an output stream that renders `graph` in its callback.
///
/// `graph` must run at [`AudioBackend::actual_sample_rate`] for `config`;
/// the control side keeps the [`GraphLink`](tessitura_synth::GraphLink)
/// returned next to it by [`RenderGraph::linked`].
pub fn start_output(
    backend: &dyn AudioBackend,
    config: &OutputConfig,
    mut graph: RenderGraph,
) -> Result<StreamHandle> {
    let expected = backend.actual_sample_rate(config);
    if (graph.sample_rate() - expected as f32).abs() > 0.5 {
        return Err(Error::InvalidConfig(format!(
            "renderer runs at {} Hz but the stream runs at {} Hz",
            graph.sample_rate(),
            expected
        )));
    }

    let channels = usize::from(config.channels.max(1));
    tracing::debug!(backend = backend.name(), channels, "hosting renderer");
    backend.build_output_stream(
        config,
        Box::new(move |data: &mut [f32]| graph.render(data, channels)),
        Box::new(|err| tracing::error!(error = err, "audio output error")),
    )
}
