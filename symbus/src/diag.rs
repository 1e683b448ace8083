//! Human-readable diagnostics readout

use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::String;

use crate::burst::BURST_SIZE_MAX;
use crate::config::RunnerMode;
use crate::engine::Core;

// Fixed rendering buffer; the readout truncates beyond it.
const INFO_TEXT_MAX: usize = 2048;

/// Copies the rendered snapshot into `buf`, starting at `offset`.
/// Returns the number of bytes written; zero once `offset` passes the end.
pub(crate) fn read<M: RawMutex>(core: &Core<'_, M>, offset: usize, buf: &mut [u8]) -> usize {
    let text = render(core);
    let bytes = text.as_bytes();
    if offset >= bytes.len() {
        return 0;
    }
    let count = (bytes.len() - offset).min(buf.len());
    buf[..count].copy_from_slice(&bytes[offset..offset + count]);
    count
}

fn render<M: RawMutex>(core: &Core<'_, M>) -> String<INFO_TEXT_MAX> {
    let mut text = String::new();
    let stats = core.stats().snapshot();
    let config = core.config();

    let runner_mode = match config.runner_mode {
        RunnerMode::Shared => "shared",
        RunnerMode::SharedHighPriority => "shared-highpri",
        RunnerMode::Private => "private",
    };

    let res = write!(
        text,
        "Statistics:\n\
         other side indicated errors:  {}\n\
         other side no reaction errors:  {}\n\
         bursts done OK:  {}\n\
         peer flag edges detected:  {}\n\
         \n\
         Configuration:\n\
         max burst size: {} bytes\n\
         our flag min inactive time: {} us\n\
         peer wait timeout: {} ms\n\
         error recovery silence time: {} ms\n\
         runner mode: {}\n\
         verbosity level: {}\n\
         \n\
         Note: statistical/monitoring info is not expected to be used in\n\
         precise measurements, atomic self-consistency maintenance would\n\
         put overhead in the transport.\n",
        stats.other_side_indicated,
        stats.other_side_silent,
        stats.bursts_done,
        stats.peer_flag_edges,
        BURST_SIZE_MAX,
        config.inactive_min.as_micros(),
        config.peer_wait_timeout.as_millis(),
        config.recovery_silence.as_millis(),
        runner_mode,
        config.verbosity,
    );
    if res.is_err() {
        warn!("diagnostics output was too big for the buffer");
    }
    text
}
