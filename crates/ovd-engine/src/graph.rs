//! Binding to the PipeWire graph runtime: main loop, core connect, stream
//! lifecycle, and registry-driven sink discovery.

use std::cell::Cell;
use std::io::Cursor;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use ovd_core::{
    CHANNELS, DISCOVERY_ITERATION_CAP, DISCOVERY_POLL_MS, PLAYBACK_MEDIA_ROLE, PLAYBACK_NODE_NAME,
    VIRTUAL_GROUP, VIRTUAL_SINK_DESCRIPTION, VIRTUAL_SINK_NAME, VIRTUAL_SINK_ROLE,
};
use pipewire as pw;
use pw::keys;
use pw::properties::properties;
use pw::spa::{self, pod::Pod, utils::Direction};
use pw::stream::{StreamBox, StreamFlags, StreamState};

use crate::capture::process_block;
use crate::error::GraphError;
use crate::playback::{fill_from_ring, requested_frames};
use crate::registry::SinkRecord;
use crate::shared::Shared;

/// One-shot connect/disconnect probe used before a real `start()`, to
/// fail fast if the runtime can't be reached at all.
pub fn probe_available() -> bool {
    pw::init();
    (|| -> Result<(), pw::Error> {
        let main_loop = pw::main_loop::MainLoopRc::new(None)?;
        let context = pw::context::ContextRc::new(&main_loop, None)?;
        let _core = context.connect_rc(None)?;
        Ok(())
    })()
    .is_ok()
}

fn format_pod(rate: u32, channels: u32) -> Result<Vec<u8>, GraphError> {
    let mut info = spa::param::audio::AudioInfoRaw::new();
    info.set_format(spa::param::audio::AudioFormat::F32LE);
    info.set_rate(rate);
    info.set_channels(channels);
    let mut position = [0; spa::param::audio::MAX_CHANNELS];
    position[0] = spa::sys::SPA_AUDIO_CHANNEL_FL;
    position[1] = spa::sys::SPA_AUDIO_CHANNEL_FR;
    info.set_position(position);

    let (cursor, _) = pw::spa::pod::serialize::PodSerializer::serialize(
        Cursor::new(Vec::new()),
        &pw::spa::pod::Value::Object(pw::spa::pod::Object {
            type_: spa::utils::SpaTypes::ObjectParamFormat.as_raw(),
            id: spa::param::ParamType::EnumFormat.as_raw(),
            properties: info.into(),
        }),
    )
    .map_err(|_| GraphError::CaptureStreamFailed("format pod serialize failed".into()))?;
    Ok(cursor.into_inner())
}

/// Owns a stream together with the listener registered on it — PipeWire
/// detaches a listener as soon as its handle drops, so the two must live
/// and die together.
struct StreamHandle {
    stream: StreamBox,
    _listener: Box<dyn std::any::Any>,
}

fn build_capture_stream(
    core: &pw::core::Core,
    shared: &Arc<Shared>,
) -> Result<StreamHandle, GraphError> {
    if shared.config.debug {
        debug!(
            "capture stream connecting, latency {} / max {}",
            shared.config.latency, shared.config.max_latency
        );
    }

    let props = properties! {
        *keys::MEDIA_CLASS => "Audio/Sink",
        *keys::NODE_NAME => VIRTUAL_SINK_NAME,
        *keys::NODE_DESCRIPTION => VIRTUAL_SINK_DESCRIPTION,
        *keys::MEDIA_ROLE => VIRTUAL_SINK_ROLE,
        *keys::NODE_LATENCY => shared.config.latency.as_str(),
        *keys::NODE_MAX_LATENCY => shared.config.max_latency.as_str(),
        "node.lock-quantum" => "true",
        "node.rate" => shared.config.rate.to_string(),
        "node.group" => VIRTUAL_GROUP,
        "link-group" => VIRTUAL_GROUP,
    };

    let stream = StreamBox::new(core, VIRTUAL_SINK_NAME, props)
        .map_err(|e| GraphError::CaptureStreamFailed(e.to_string()))?;

    let cb_shared = shared.clone();
    let state_shared = shared.clone();
    let listener = stream
        .add_local_listener_with_user_data(())
        .state_changed(move |_, _, previous, current| {
            if state_shared.config.debug {
                debug!("capture stream state {previous:?} -> {current:?}");
            }
        })
        .process(move |stream, _| {
            on_capture_process(stream, &cb_shared);
        })
        .register()
        .map_err(|e| GraphError::CaptureStreamFailed(e.to_string()))?;

    let bytes = format_pod(shared.config.rate, CHANNELS as u32)?;
    let mut params =
        [Pod::from_bytes(&bytes).ok_or_else(|| GraphError::CaptureStreamFailed("bad pod".into()))?];
    stream
        .connect(
            Direction::Input,
            None,
            StreamFlags::MAP_BUFFERS | StreamFlags::RT_PROCESS,
            &mut params,
        )
        .map_err(|e| GraphError::CaptureStreamFailed(e.to_string()))?;

    Ok(StreamHandle { stream, _listener: Box::new(listener) })
}

fn on_capture_process(stream: &pw::stream::Stream, shared: &Arc<Shared>) {
    let Some(mut buffer) = stream.dequeue_buffer() else {
        return;
    };
    let master = ovd_core::gain_from_bits(shared.master_gain_bits.load(Ordering::Acquire));
    let stride = CHANNELS * std::mem::size_of::<f32>();
    // Fixed on-stack scratch for one block; no heap traffic in this callback.
    let mut scratch = [0.0_f32; ovd_core::BLOCK_FRAMES * CHANNELS];

    for data in buffer.datas_mut() {
        let size = data.chunk().size() as usize;
        if size == 0 || stride == 0 {
            continue;
        }
        let Some(slice) = data.data() else { continue };
        let total_frames = (size.min(slice.len())) / stride;
        let input: &[f32] = bytemuck::cast_slice(&slice[..total_frames * stride]);

        let mut frame_offset = 0;
        while frame_offset < total_frames {
            let block = (total_frames - frame_offset).min(ovd_core::BLOCK_FRAMES);
            let in_block = &input[frame_offset * CHANNELS..(frame_offset + block) * CHANNELS];
            let out_block = &mut scratch[..block * CHANNELS];

            // SAFETY: the capture callback is the only caller of `get_mut`.
            let states = unsafe { shared.states.get_mut() };
            process_block(in_block, out_block, block, CHANNELS, master, shared.coeffs.current(), states);

            let written = shared.ring.write(out_block, block);
            if written < block {
                shared.dropped_frames.fetch_add((block - written) as u64, Ordering::Relaxed);
            }
            frame_offset += block;
        }
    }

    if shared.pb_streaming.load(Ordering::Acquire) {
        let _ = stream.trigger_process();
    }
}

fn build_playback_stream(
    core: &pw::core::Core,
    shared: &Arc<Shared>,
    target_serial: u32,
) -> Result<StreamHandle, GraphError> {
    if shared.config.debug {
        debug!(
            "playback stream connecting to serial {target_serial}, latency {} / max {}",
            shared.config.latency, shared.config.max_latency
        );
    }

    let props = properties! {
        *keys::MEDIA_TYPE => "Audio",
        *keys::MEDIA_CATEGORY => "Playback",
        *keys::MEDIA_ROLE => PLAYBACK_MEDIA_ROLE,
        *keys::NODE_NAME => PLAYBACK_NODE_NAME,
        *keys::TARGET_OBJECT => target_serial.to_string(),
        *keys::NODE_LATENCY => shared.config.latency.as_str(),
        *keys::NODE_MAX_LATENCY => shared.config.max_latency.as_str(),
        "node.group" => VIRTUAL_GROUP,
        "link-group" => VIRTUAL_GROUP,
    };

    let stream = StreamBox::new(core, PLAYBACK_NODE_NAME, props)
        .map_err(|e| GraphError::PlaybackStreamFailed(e.to_string()))?;

    let cb_shared = shared.clone();
    let state_shared = shared.clone();
    let listener = stream
        .add_local_listener_with_user_data(())
        .state_changed(move |_, _, _, current| {
            state_shared
                .pb_streaming
                .store(matches!(current, StreamState::Streaming), Ordering::Release);
        })
        .process(move |stream, _| {
            on_playback_process(stream, &cb_shared);
        })
        .register()
        .map_err(|e| GraphError::PlaybackStreamFailed(e.to_string()))?;

    let bytes = format_pod(shared.config.rate, CHANNELS as u32)?;
    let mut params =
        [Pod::from_bytes(&bytes).ok_or_else(|| GraphError::PlaybackStreamFailed("bad pod".into()))?];
    stream
        .connect(
            Direction::Output,
            None,
            StreamFlags::AUTOCONNECT
                | StreamFlags::DONT_RECONNECT
                | StreamFlags::TRIGGER
                | StreamFlags::MAP_BUFFERS
                | StreamFlags::RT_PROCESS,
            &mut params,
        )
        .map_err(|e| GraphError::PlaybackStreamFailed(e.to_string()))?;

    Ok(StreamHandle { stream, _listener: Box::new(listener) })
}

fn on_playback_process(stream: &pw::stream::Stream, shared: &Arc<Shared>) {
    let Some(mut buffer) = stream.dequeue_buffer() else {
        return;
    };
    let stride = CHANNELS * std::mem::size_of::<f32>();

    for data in buffer.datas_mut() {
        let maxsize = data.maxsize() as usize;
        let chunk_size = data.chunk().size() as usize;
        let frames = requested_frames(chunk_size, stride, maxsize);
        if frames == 0 {
            continue;
        }
        let Some(slice) = data.data() else { continue };
        let out: &mut [f32] = bytemuck::cast_slice_mut(&mut slice[..frames * stride]);
        fill_from_ring(&shared.ring, out, frames);

        let chunk = data.chunk_mut();
        *chunk.offset_mut() = 0;
        *chunk.stride_mut() = stride as i32;
        *chunk.size_mut() = (frames * stride) as u32;
    }
}

fn media_class_is_audio_sink(props: Option<&spa::utils::dict::DictRef>) -> bool {
    props
        .and_then(|p| p.get("media.class"))
        .map(|c| c == "Audio/Sink")
        .unwrap_or(false)
        && props.and_then(|p| p.get("object.serial")).is_some()
}

fn record_from_props(id: u32, props: Option<&spa::utils::dict::DictRef>) -> Option<SinkRecord> {
    let props = props?;
    let serial: u32 = props.get("object.serial")?.parse().ok()?;
    let name = props.get("node.name").unwrap_or("").to_string();
    let desc = props.get("node.description").unwrap_or("").to_string();
    Some(SinkRecord { id, serial, name, desc })
}

/// Runs the full engine lifecycle on the calling thread: connects to the
/// runtime, discovers sinks, connects capture (and playback, if a target
/// is available), then services the event loop until `shared.quit` is
/// raised. Blocks for as long as the engine is running, matching the
/// control surface's `start` contract.
pub fn run(shared: Arc<Shared>) -> Result<(), GraphError> {
    if shared.config.debug {
        debug!(
            "ring buffer sized to {} frames, {} channels",
            shared.ring.capacity(),
            shared.ring.channels()
        );
    }

    pw::init();
    let main_loop = pw::main_loop::MainLoopRc::new(None).map_err(|_| GraphError::InitFailed)?;
    let context = pw::context::ContextRc::new(&main_loop, None).map_err(|_| GraphError::InitFailed)?;
    let core = context
        .connect_rc(None)
        .map_err(|e| GraphError::CoreConnectFailed(e.to_string()))?;

    let registry = core
        .get_registry()
        .map_err(|e| GraphError::CoreConnectFailed(e.to_string()))?;

    let add_shared = shared.clone();
    let remove_shared = shared.clone();
    let _registry_listener = registry
        .add_listener_local()
        .global(move |global| {
            if media_class_is_audio_sink(global.props) {
                if let Some(record) = record_from_props(global.id, global.props) {
                    add_shared.registry.insert(record);
                }
            }
        })
        .global_remove(move |id| {
            if let Some(serial) = remove_shared.registry.remove_by_id(id) {
                if remove_shared.target_serial.load(Ordering::Acquire) == serial {
                    remove_shared.target_serial.store(0, Ordering::Release);
                    remove_shared.reconnect.store(true, Ordering::Release);
                }
            }
        })
        .register();

    let done = Rc::new(Cell::new(false));
    let done_for_core = done.clone();
    let _core_listener = core
        .add_listener_local()
        .done(move |id, _seq| {
            if id == pw::core::PW_ID_CORE {
                done_for_core.set(true);
            }
        })
        .register();

    let _ = core.sync(0);
    for _ in 0..DISCOVERY_ITERATION_CAP {
        main_loop.loop_().iterate(Duration::from_millis(DISCOVERY_POLL_MS as u64));
        if done.get() {
            break;
        }
    }
    if !done.get() {
        warn!("sink discovery did not observe a done event within the iteration cap");
    }

    let target = shared
        .registry
        .find_by_identity(&shared.config.preferred_sink_name, &shared.config.preferred_sink_desc)
        .or_else(|| shared.registry.first_serial());
    if let Some(serial) = target {
        shared.target_serial.store(serial, Ordering::Release);
    }

    let capture_stream = build_capture_stream(&core, &shared)?;

    let mut playback_stream = None;
    let initial_target = shared.target_serial.load(Ordering::Acquire);
    if initial_target != 0 {
        match build_playback_stream(&core, &shared, initial_target) {
            Ok(stream) => playback_stream = Some(stream),
            Err(e) => warn!("initial playback connect failed, continuing capture-only: {e}"),
        }
    }

    loop {
        main_loop
            .loop_()
            .iterate(Duration::from_millis(shared.config.poll_ms as u64));

        if shared.reconnect.swap(false, Ordering::AcqRel) {
            let serial = shared.target_serial.load(Ordering::Acquire);
            if shared.config.debug {
                debug!("reconnect requested, target serial now {serial}");
            }
            playback_stream.take();
            shared.pb_streaming.store(false, Ordering::Release);
            if serial != 0 {
                match build_playback_stream(&core, &shared, serial) {
                    Ok(stream) => playback_stream = Some(stream),
                    Err(e) => warn!("reconnect failed, remaining capture-only: {e}"),
                }
            }
        }

        if shared.quit.load(Ordering::Acquire) {
            break;
        }
    }

    drop(playback_stream);
    drop(capture_stream);
    drop(_registry_listener);
    drop(_core_listener);
    drop(registry);
    drop(core);
    drop(context);
    drop(main_loop);
    pw::deinit();

    Ok(())
}
