//! Animation section of a `.skel` stream.
//!
//! Timeline groups are read in a fixed order (slots, bones, IK, transform, path, deform, draw
//! order, events). Targets are referenced by index into the setup arrays read before.

use crate::binary::{DecodeContext, Setup, read_ref};
use crate::input::BinaryInput;
use crate::{
    Animation, AttachmentFrame, BoneTimelines, ColorFrame, Curve, DeformFrame, DeformTimelines,
    DrawOrderFrame, DrawOrderOffset, Error, EventFrame, IkFrame, PathMixFrame, PathTimelines,
    PositionFrame, RotateFrame, SlotTimelines, SpacingFrame, TransformFrame, TwoColorFrame,
    Vec2Frame, VertexDelta,
};
use indexmap::IndexMap;

const CURVE_LINEAR: u8 = 0;
const CURVE_STEPPED: u8 = 1;
const CURVE_BEZIER: u8 = 2;

const SLOT_ATTACHMENT: u8 = 0;
const SLOT_COLOR: u8 = 1;
const SLOT_TWO_COLOR: u8 = 2;

const BONE_ROTATE: u8 = 0;
const BONE_TRANSLATE: u8 = 1;
const BONE_SCALE: u8 = 2;
const BONE_SHEAR: u8 = 3;

const PATH_POSITION: u8 = 0;
const PATH_SPACING: u8 = 1;
const PATH_MIX: u8 = 2;

trait Keyframe {
    fn time(&self) -> f32;
}

/// Keyframe followed by a curve segment in the stream (unless it is the last one).
trait CurveKeyframe: Keyframe {
    fn set_curve(&mut self, curve: Curve);
}

macro_rules! impl_keyframe {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Keyframe for $ty {
                fn time(&self) -> f32 {
                    self.time
                }
            }
        )*
    };
}

macro_rules! impl_curve_keyframe {
    ($($ty:ty),* $(,)?) => {
        $(
            impl_keyframe!($ty);

            impl CurveKeyframe for $ty {
                fn set_curve(&mut self, curve: Curve) {
                    self.curve = curve;
                }
            }
        )*
    };
}

impl_keyframe!(AttachmentFrame, DrawOrderFrame, EventFrame);
impl_curve_keyframe!(
    ColorFrame,
    TwoColorFrame,
    RotateFrame,
    Vec2Frame,
    IkFrame,
    TransformFrame,
    PositionFrame,
    SpacingFrame,
    PathMixFrame,
    DeformFrame,
);

/// Running maximum of the last keyframe time of every timeline read so far.
#[derive(Copy, Clone, Debug, Default)]
struct DurationTracker(f32);

impl DurationTracker {
    fn track<F: Keyframe>(&mut self, frames: &[F]) {
        if let Some(last) = frames.last() {
            self.0 = self.0.max(last.time());
        }
    }
}

fn read_curve(input: &mut BinaryInput<'_>) -> Result<Curve, Error> {
    let offset = input.cursor();
    match input.read_u8()? {
        CURVE_LINEAR => Ok(Curve::Linear),
        CURVE_STEPPED => Ok(Curve::Stepped),
        CURVE_BEZIER => Ok(Curve::Bezier {
            cx1: input.read_f32_be()?,
            cy1: input.read_f32_be()?,
            cx2: input.read_f32_be()?,
            cy2: input.read_f32_be()?,
        }),
        other => Err(Error::InvalidValue {
            context: "curve type",
            value: other.into(),
            offset,
        }),
    }
}

/// Reads `frame_count` frames, each starting with its time.
fn read_timeline<'a, F: Keyframe>(
    input: &mut BinaryInput<'a>,
    frame_count: usize,
    mut read_frame: impl FnMut(&mut BinaryInput<'a>, f32) -> Result<F, Error>,
) -> Result<Vec<F>, Error> {
    let mut frames = Vec::with_capacity(input.capacity(frame_count));
    for _ in 0..frame_count {
        let time = input.read_f32_be()?;
        frames.push(read_frame(input, time)?);
    }
    Ok(frames)
}

/// Like [`read_timeline`], with a curve segment after every frame but the last.
fn read_curve_timeline<'a, F: CurveKeyframe>(
    input: &mut BinaryInput<'a>,
    frame_count: usize,
    mut read_frame: impl FnMut(&mut BinaryInput<'a>, f32) -> Result<F, Error>,
) -> Result<Vec<F>, Error> {
    let mut frames = Vec::with_capacity(input.capacity(frame_count));
    for frame_index in 0..frame_count {
        let time = input.read_f32_be()?;
        let mut frame = read_frame(input, time)?;
        if frame_index + 1 < frame_count {
            frame.set_curve(read_curve(input)?);
        }
        frames.push(frame);
    }
    Ok(frames)
}

fn invalid_timeline_type(context: &'static str, value: u8, offset: usize) -> Error {
    Error::InvalidValue {
        context,
        value: value.into(),
        offset,
    }
}

pub(crate) fn read_animations(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    setup: &Setup<'_>,
) -> Result<IndexMap<String, Animation>, Error> {
    let count = input.read_len()?;
    let mut animations = IndexMap::with_capacity(input.capacity(count));
    for _ in 0..count {
        let name = input.read_string()?.unwrap_or_default();
        let offset = input.cursor();
        let animation = read_animation(input, ctx, setup)?;
        log::trace!(
            "animation {name:?} at offset {offset}: duration={}",
            animation.duration
        );
        animations.insert(name, animation);
    }
    log::debug!("skel animations: {}", animations.len());
    Ok(animations)
}

fn read_animation(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    setup: &Setup<'_>,
) -> Result<Animation, Error> {
    let mut duration = DurationTracker::default();

    let slots = read_slot_timelines(input, setup, &mut duration)?;
    let bones = read_bone_timelines(input, ctx, setup, &mut duration)?;
    let ik = read_ik_timelines(input, setup, &mut duration)?;
    let transform = read_transform_timelines(input, setup, &mut duration)?;
    let paths = read_path_timelines(input, ctx, setup, &mut duration)?;
    let deform = read_deform_timelines(input, ctx, setup, &mut duration)?;
    let draw_order = read_draw_order_timeline(input, setup, &mut duration)?;
    let events = read_event_timeline(input, setup, &mut duration)?;

    Ok(Animation {
        slots,
        bones,
        ik,
        transform,
        paths,
        deform,
        draw_order,
        events,
        duration: duration.0,
    })
}

fn read_slot_timelines(
    input: &mut BinaryInput<'_>,
    setup: &Setup<'_>,
    duration: &mut DurationTracker,
) -> Result<IndexMap<String, SlotTimelines>, Error> {
    let count = input.read_len()?;
    let mut out = IndexMap::with_capacity(input.capacity(count));
    for _ in 0..count {
        let slot = read_ref(input, setup.slots, "slot")?.name.clone();
        let mut timelines = SlotTimelines::default();
        for _ in 0..input.read_len()? {
            let offset = input.cursor();
            let timeline_type = input.read_u8()?;
            let frame_count = input.read_len()?;
            match timeline_type {
                SLOT_ATTACHMENT => {
                    let frames = read_timeline(input, frame_count, |input, time| {
                        Ok(AttachmentFrame {
                            time,
                            name: input.read_string()?,
                        })
                    })?;
                    duration.track(&frames);
                    timelines.attachment = Some(frames);
                }
                SLOT_COLOR => {
                    let frames = read_curve_timeline(input, frame_count, |input, time| {
                        Ok(ColorFrame {
                            time,
                            color: input.read_color()?,
                            curve: Curve::Linear,
                        })
                    })?;
                    duration.track(&frames);
                    timelines.color = Some(frames);
                }
                SLOT_TWO_COLOR => {
                    let frames = read_curve_timeline(input, frame_count, |input, time| {
                        Ok(TwoColorFrame {
                            time,
                            light: input.read_color()?,
                            dark: input.read_color()?,
                            curve: Curve::Linear,
                        })
                    })?;
                    duration.track(&frames);
                    timelines.two_color = Some(frames);
                }
                other => return Err(invalid_timeline_type("slot timeline type", other, offset)),
            }
        }
        out.insert(slot, timelines);
    }
    Ok(out)
}

fn read_bone_timelines(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    setup: &Setup<'_>,
    duration: &mut DurationTracker,
) -> Result<IndexMap<String, BoneTimelines>, Error> {
    let count = input.read_len()?;
    let mut out = IndexMap::with_capacity(input.capacity(count));
    for _ in 0..count {
        let bone = read_ref(input, setup.bones, "bone")?.name.clone();
        let mut timelines = BoneTimelines::default();
        for _ in 0..input.read_len()? {
            let offset = input.cursor();
            let timeline_type = input.read_u8()?;
            let frame_count = input.read_len()?;
            match timeline_type {
                BONE_ROTATE => {
                    let frames = read_curve_timeline(input, frame_count, |input, time| {
                        Ok(RotateFrame {
                            time,
                            angle: input.read_f32_be()?,
                            curve: Curve::Linear,
                        })
                    })?;
                    duration.track(&frames);
                    timelines.rotate = Some(frames);
                }
                BONE_TRANSLATE | BONE_SCALE | BONE_SHEAR => {
                    // Only translation is a length.
                    let value_scale = if timeline_type == BONE_TRANSLATE {
                        ctx.scale
                    } else {
                        1.0
                    };
                    let frames = read_curve_timeline(input, frame_count, |input, time| {
                        Ok(Vec2Frame {
                            time,
                            x: input.read_f32_be()? * value_scale,
                            y: input.read_f32_be()? * value_scale,
                            curve: Curve::Linear,
                        })
                    })?;
                    duration.track(&frames);
                    match timeline_type {
                        BONE_TRANSLATE => timelines.translate = Some(frames),
                        BONE_SCALE => timelines.scale = Some(frames),
                        _ => timelines.shear = Some(frames),
                    }
                }
                other => return Err(invalid_timeline_type("bone timeline type", other, offset)),
            }
        }
        out.insert(bone, timelines);
    }
    Ok(out)
}

fn read_ik_timelines(
    input: &mut BinaryInput<'_>,
    setup: &Setup<'_>,
    duration: &mut DurationTracker,
) -> Result<IndexMap<String, Vec<IkFrame>>, Error> {
    let count = input.read_len()?;
    let mut out = IndexMap::with_capacity(input.capacity(count));
    for _ in 0..count {
        let constraint = read_ref(input, setup.ik, "ik constraint")?.name.clone();
        let frame_count = input.read_len()?;
        let frames = read_curve_timeline(input, frame_count, |input, time| {
            Ok(IkFrame {
                time,
                mix: input.read_f32_be()?,
                bend_positive: input.read_u8()? != 0xFF,
                curve: Curve::Linear,
            })
        })?;
        duration.track(&frames);
        out.insert(constraint, frames);
    }
    Ok(out)
}

fn read_transform_timelines(
    input: &mut BinaryInput<'_>,
    setup: &Setup<'_>,
    duration: &mut DurationTracker,
) -> Result<IndexMap<String, Vec<TransformFrame>>, Error> {
    let count = input.read_len()?;
    let mut out = IndexMap::with_capacity(input.capacity(count));
    for _ in 0..count {
        let constraint = read_ref(input, setup.transform, "transform constraint")?
            .name
            .clone();
        let frame_count = input.read_len()?;
        let frames = read_curve_timeline(input, frame_count, |input, time| {
            Ok(TransformFrame {
                time,
                rotate_mix: input.read_f32_be()?,
                translate_mix: input.read_f32_be()?,
                scale_mix: input.read_f32_be()?,
                shear_mix: input.read_f32_be()?,
                curve: Curve::Linear,
            })
        })?;
        duration.track(&frames);
        out.insert(constraint, frames);
    }
    Ok(out)
}

fn read_path_timelines(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    setup: &Setup<'_>,
    duration: &mut DurationTracker,
) -> Result<IndexMap<String, PathTimelines>, Error> {
    let count = input.read_len()?;
    let mut out = IndexMap::with_capacity(input.capacity(count));
    for _ in 0..count {
        let constraint = read_ref(input, setup.path, "path constraint")?;
        let mut timelines = PathTimelines::default();
        for _ in 0..input.read_len()? {
            let offset = input.cursor();
            let timeline_type = input.read_u8()?;
            let frame_count = input.read_len()?;
            match timeline_type {
                PATH_POSITION => {
                    let value_scale = if constraint.position_mode.is_length() {
                        ctx.scale
                    } else {
                        1.0
                    };
                    let frames = read_curve_timeline(input, frame_count, |input, time| {
                        Ok(PositionFrame {
                            time,
                            position: input.read_f32_be()? * value_scale,
                            curve: Curve::Linear,
                        })
                    })?;
                    duration.track(&frames);
                    timelines.position = Some(frames);
                }
                PATH_SPACING => {
                    let value_scale = if constraint.spacing_mode.is_length() {
                        ctx.scale
                    } else {
                        1.0
                    };
                    let frames = read_curve_timeline(input, frame_count, |input, time| {
                        Ok(SpacingFrame {
                            time,
                            spacing: input.read_f32_be()? * value_scale,
                            curve: Curve::Linear,
                        })
                    })?;
                    duration.track(&frames);
                    timelines.spacing = Some(frames);
                }
                PATH_MIX => {
                    let frames = read_curve_timeline(input, frame_count, |input, time| {
                        Ok(PathMixFrame {
                            time,
                            rotate_mix: input.read_f32_be()?,
                            translate_mix: input.read_f32_be()?,
                            curve: Curve::Linear,
                        })
                    })?;
                    duration.track(&frames);
                    timelines.mix = Some(frames);
                }
                other => return Err(invalid_timeline_type("path timeline type", other, offset)),
            }
        }
        out.insert(constraint.name.clone(), timelines);
    }
    Ok(out)
}

fn read_deform_timelines(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    setup: &Setup<'_>,
    duration: &mut DurationTracker,
) -> Result<DeformTimelines, Error> {
    let skin_count = input.read_len()?;
    let mut out = DeformTimelines::with_capacity(input.capacity(skin_count));
    for _ in 0..skin_count {
        let skin = read_ref(input, setup.skins, "skin")?.clone();
        let slot_count = input.read_len()?;
        let mut slots = IndexMap::with_capacity(input.capacity(slot_count));
        for _ in 0..slot_count {
            let slot = read_ref(input, setup.slots, "slot")?.name.clone();
            let mesh_count = input.read_len()?;
            let mut meshes = IndexMap::with_capacity(input.capacity(mesh_count));
            for _ in 0..mesh_count {
                let mesh = input.read_string()?.unwrap_or_default();
                let frame_count = input.read_len()?;
                let frames = read_curve_timeline(input, frame_count, |input, time| {
                    let end = input.read_len()?;
                    let delta = if end == 0 {
                        None
                    } else {
                        let offset = input.read_len()?;
                        Some(VertexDelta {
                            offset,
                            vertices: input.read_f32_array(end, ctx.scale)?,
                        })
                    };
                    Ok(DeformFrame {
                        time,
                        delta,
                        curve: Curve::Linear,
                    })
                })?;
                duration.track(&frames);
                meshes.insert(mesh, frames);
            }
            slots.insert(slot, meshes);
        }
        out.insert(skin, slots);
    }
    Ok(out)
}

fn read_draw_order_timeline(
    input: &mut BinaryInput<'_>,
    setup: &Setup<'_>,
    duration: &mut DurationTracker,
) -> Result<Option<Vec<DrawOrderFrame>>, Error> {
    let frame_count = input.read_len()?;
    if frame_count == 0 {
        return Ok(None);
    }
    let frames = read_timeline(input, frame_count, |input, time| {
        let offset_count = input.read_len()?;
        let mut offsets = Vec::with_capacity(input.capacity(offset_count));
        for _ in 0..offset_count {
            let slot = read_ref(input, setup.slots, "slot")?.name.clone();
            // Written as a positive-optimized varint; negative shifts wrap through u32.
            let offset = input.read_varint(true)?;
            offsets.push(DrawOrderOffset { slot, offset });
        }
        Ok(DrawOrderFrame { time, offsets })
    })?;
    duration.track(&frames);
    Ok(Some(frames))
}

fn read_event_timeline(
    input: &mut BinaryInput<'_>,
    setup: &Setup<'_>,
    duration: &mut DurationTracker,
) -> Result<Option<Vec<EventFrame>>, Error> {
    let frame_count = input.read_len()?;
    if frame_count == 0 {
        return Ok(None);
    }
    let frames = read_timeline(input, frame_count, |input, time| {
        let name = read_ref(input, setup.events, "event")?.clone();
        let int_value = input.read_varint(false)?;
        let float_value = input.read_f32_be()?;
        let string = if input.read_bool()? {
            input.read_string()?
        } else {
            setup
                .event_defaults
                .get(&name)
                .and_then(|e| e.string.clone())
        };
        Ok(EventFrame {
            time,
            name,
            int_value,
            float_value,
            string,
        })
    })?;
    duration.track(&frames);
    Ok(Some(frames))
}
