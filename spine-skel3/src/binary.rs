//! Spine `.skel` (binary) loader for Spine 3.3–3.6 exports.
//!
//! The loader is IO-free: it operates on an in-memory byte slice and reads it front to back
//! exactly once. Entities declared earlier in the stream are referenced later by index; every
//! such index is resolved to a name (and bounds checked) as soon as it is read.

use crate::input::BinaryInput;
use crate::{
    Attachment, AttachmentKind, BlendMode, Bone, BoundingBoxAttachment, Capabilities,
    ClippingAttachment, Color, DEFAULT_SKIN_NAME, DecodeOptions, Document, Error, EventData,
    IkConstraint, Inheritance, LinkedMeshAttachment, MeshAttachment, Metadata, PathAttachment,
    PathConstraint, PointAttachment, PositionMode, RegionAttachment, RotateMode, Skin, Slot,
    SpacingMode, SpineVersion, TransformConstraint, TransformMode, Vertices,
};
use indexmap::IndexMap;

/// Per-decode settings consulted at every conditional read.
#[derive(Copy, Clone, Debug)]
pub(crate) struct DecodeContext {
    pub(crate) scale: f32,
    pub(crate) caps: Capabilities,
    pub(crate) nonessential: bool,
}

/// Setup-pose entities, frozen once the structural sections are read. Animation timelines only
/// look entries up by declaration index.
pub(crate) struct Setup<'d> {
    pub(crate) bones: &'d [Bone],
    pub(crate) slots: &'d [Slot],
    pub(crate) ik: &'d [IkConstraint],
    pub(crate) transform: &'d [TransformConstraint],
    pub(crate) path: &'d [PathConstraint],
    /// Skin names in declaration order, the default skin first when present.
    pub(crate) skins: &'d [String],
    /// Event names in declaration order.
    pub(crate) events: &'d [String],
    pub(crate) event_defaults: &'d IndexMap<String, EventData>,
}

/// Reads a positive varint index and resolves it against `items`.
pub(crate) fn read_ref<'t, T>(
    input: &mut BinaryInput<'_>,
    items: &'t [T],
    kind: &'static str,
) -> Result<&'t T, Error> {
    let offset = input.cursor();
    let index = input.read_len()?;
    items.get(index).ok_or(Error::UnknownReference {
        kind,
        index,
        len: items.len(),
        offset,
    })
}

fn read_enum<T>(
    input: &mut BinaryInput<'_>,
    context: &'static str,
    map: fn(usize) -> Option<T>,
) -> Result<T, Error> {
    let offset = input.cursor();
    let value = input.read_len()?;
    map(value).ok_or(Error::InvalidValue {
        context,
        value: value as i64,
        offset,
    })
}

/// `Some(value * scale)` unless `value` equals the field default.
fn non_default(value: f32, default: f32, scale: f32) -> Option<f32> {
    (value != default).then(|| value * scale)
}

fn non_white(color: Color) -> Option<Color> {
    (!color.is_white()).then_some(color)
}

impl Document {
    pub fn from_skel_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_skel_bytes_with_options(bytes, &DecodeOptions::default())
    }

    pub fn from_skel_bytes_with_scale(bytes: &[u8], scale: f32) -> Result<Self, Error> {
        Self::from_skel_bytes_with_options(bytes, &DecodeOptions::default().with_scale(scale))
    }

    pub fn from_skel_bytes_with_options(
        bytes: &[u8],
        options: &DecodeOptions,
    ) -> Result<Self, Error> {
        let mut input = BinaryInput::new(bytes, options.eof_policy);
        let (skeleton, ctx) = read_header(&mut input, options.effective_scale())?;

        let bones = read_bones(&mut input, &ctx)?;
        let slots = read_slots(&mut input, &ctx, &bones)?;
        let ik = read_ik_constraints(&mut input, &ctx, &bones)?;
        let transform = read_transform_constraints(&mut input, &ctx, &bones)?;
        let path = read_path_constraints(&mut input, &ctx, &bones, &slots)?;
        let (skins, skin_names) = read_skins(&mut input, &ctx, &bones, &slots)?;
        let (events, event_names) = read_events(&mut input)?;
        log::debug!(
            "skel setup: bones={} slots={} ik={} transform={} path={} skins={} events={}",
            bones.len(),
            slots.len(),
            ik.len(),
            transform.len(),
            path.len(),
            skins.len(),
            events.len()
        );

        let animations = crate::animation::read_animations(
            &mut input,
            &ctx,
            &Setup {
                bones: &bones,
                slots: &slots,
                ik: &ik,
                transform: &transform,
                path: &path,
                skins: &skin_names,
                events: &event_names,
                event_defaults: &events,
            },
        )?;

        if input.remaining() > 0 {
            log::debug!(
                "skel decode finished with {} trailing byte(s) at offset {}",
                input.remaining(),
                input.cursor()
            );
        }

        Ok(Self {
            skeleton,
            bones,
            slots,
            ik,
            transform,
            path,
            skins,
            events,
            animations,
        })
    }
}

fn read_header(
    input: &mut BinaryInput<'_>,
    scale: f32,
) -> Result<(Metadata, DecodeContext), Error> {
    let hash = input.read_string()?.filter(|h| !h.is_empty());

    // Field presence depends on the version, so nothing past it can be read until it checks out.
    let version_string = input.read_string()?;
    let version = match version_string.as_deref() {
        Some(v) if !v.is_empty() => SpineVersion::parse(v)?,
        _ => {
            return Err(Error::UnsupportedVersion {
                value: version_string.clone(),
            });
        }
    };
    let caps = version.capabilities();

    let width = input.read_f32_be()?;
    let height = input.read_f32_be()?;
    let nonessential = input.read_bool()?;
    log::debug!(
        "skel header: spine={} nonessential={nonessential}",
        version_string.as_deref().unwrap_or_default()
    );

    let mut fps = None;
    let mut images = None;
    if nonessential {
        if caps.frame_rate {
            fps = Some(input.read_f32_be()?);
        }
        images = input.read_string()?.filter(|s| !s.is_empty());
    }

    Ok((
        Metadata {
            hash,
            version: version_string.unwrap_or_default(),
            width,
            height,
            fps,
            images,
        },
        DecodeContext {
            scale,
            caps,
            nonessential,
        },
    ))
}

fn read_bones(input: &mut BinaryInput<'_>, ctx: &DecodeContext) -> Result<Vec<Bone>, Error> {
    let count = input.read_len()?;
    let mut bones: Vec<Bone> = Vec::with_capacity(input.capacity(count));
    for i in 0..count {
        let name = input.read_string()?.unwrap_or_default();
        let parent = if i == 0 {
            None
        } else {
            Some(read_ref(input, &bones, "bone")?.name.clone())
        };

        let rotation = non_default(input.read_f32_be()?, 0.0, 1.0);
        let x = non_default(input.read_f32_be()?, 0.0, ctx.scale);
        let y = non_default(input.read_f32_be()?, 0.0, ctx.scale);
        let scale_x = non_default(input.read_f32_be()?, 1.0, 1.0);
        let scale_y = non_default(input.read_f32_be()?, 1.0, 1.0);
        let shear_x = non_default(input.read_f32_be()?, 0.0, 1.0);
        let shear_y = non_default(input.read_f32_be()?, 0.0, 1.0);
        let length = non_default(input.read_f32_be()?, 0.0, ctx.scale);

        let inherit = if ctx.caps.bone_transform_mode {
            Inheritance::Mode {
                transform: read_enum(input, "transform mode", TransformMode::from_index)?,
            }
        } else {
            Inheritance::Legacy {
                inherit_rotation: input.read_bool()?,
                inherit_scale: input.read_bool()?,
            }
        };

        let color = if ctx.nonessential {
            Some(input.read_color()?)
        } else {
            None
        };

        bones.push(Bone {
            name,
            parent,
            rotation,
            x,
            y,
            scale_x,
            scale_y,
            shear_x,
            shear_y,
            length,
            inherit,
            color,
        });
    }
    Ok(bones)
}

fn read_slots(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    bones: &[Bone],
) -> Result<Vec<Slot>, Error> {
    let count = input.read_len()?;
    let mut slots = Vec::with_capacity(input.capacity(count));
    for _ in 0..count {
        let name = input.read_string()?.unwrap_or_default();
        let bone = read_ref(input, bones, "bone")?.name.clone();
        let color = non_white(input.read_color()?);
        let dark = if ctx.caps.slot_dark_color {
            non_white(input.read_color()?)
        } else {
            None
        };
        let attachment = input.read_string()?;
        let blend = read_enum(input, "blend mode", BlendMode::from_index)?;
        slots.push(Slot {
            name,
            bone,
            color,
            dark,
            attachment,
            blend,
        });
    }
    Ok(slots)
}

/// Name, optional order and driving bones, shared by all constraint kinds.
fn read_constraint_head(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    bones: &[Bone],
) -> Result<(String, Option<i32>, Vec<String>), Error> {
    let name = input.read_string()?.unwrap_or_default();
    let order = if ctx.caps.constraint_order {
        Some(input.read_varint(true)?)
    } else {
        None
    };
    let bone_count = input.read_len()?;
    let mut constrained = Vec::with_capacity(input.capacity(bone_count));
    for _ in 0..bone_count {
        constrained.push(read_ref(input, bones, "bone")?.name.clone());
    }
    Ok((name, order, constrained))
}

fn read_ik_constraints(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    bones: &[Bone],
) -> Result<Vec<IkConstraint>, Error> {
    let count = input.read_len()?;
    let mut out = Vec::with_capacity(input.capacity(count));
    for _ in 0..count {
        let (name, order, constrained) = read_constraint_head(input, ctx, bones)?;
        let target = read_ref(input, bones, "bone")?.name.clone();
        let mix = input.read_f32_be()?;
        // Signed byte: 1 bends positive, -1 (0xFF) negative.
        let bend_positive = input.read_u8()? != 0xFF;
        out.push(IkConstraint {
            name,
            order,
            bones: constrained,
            target,
            mix,
            bend_positive,
        });
    }
    Ok(out)
}

fn read_transform_constraints(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    bones: &[Bone],
) -> Result<Vec<TransformConstraint>, Error> {
    let count = input.read_len()?;
    let mut out = Vec::with_capacity(input.capacity(count));
    for _ in 0..count {
        let (name, order, constrained) = read_constraint_head(input, ctx, bones)?;
        let target = read_ref(input, bones, "bone")?.name.clone();
        let (local, relative) = if ctx.caps.transform_local_relative {
            (Some(input.read_bool()?), Some(input.read_bool()?))
        } else {
            (None, None)
        };
        out.push(TransformConstraint {
            name,
            order,
            bones: constrained,
            target,
            local,
            relative,
            rotation: input.read_f32_be()?,
            x: input.read_f32_be()? * ctx.scale,
            y: input.read_f32_be()? * ctx.scale,
            scale_x: input.read_f32_be()?,
            scale_y: input.read_f32_be()?,
            shear_y: input.read_f32_be()?,
            rotate_mix: input.read_f32_be()?,
            translate_mix: input.read_f32_be()?,
            scale_mix: input.read_f32_be()?,
            shear_mix: input.read_f32_be()?,
        });
    }
    Ok(out)
}

fn read_path_constraints(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    bones: &[Bone],
    slots: &[Slot],
) -> Result<Vec<PathConstraint>, Error> {
    let count = input.read_len()?;
    let mut out = Vec::with_capacity(input.capacity(count));
    for _ in 0..count {
        let (name, order, constrained) = read_constraint_head(input, ctx, bones)?;
        let target = read_ref(input, slots, "slot")?.name.clone();
        let position_mode = read_enum(input, "position mode", PositionMode::from_index)?;
        let spacing_mode = read_enum(input, "spacing mode", SpacingMode::from_index)?;
        let rotate_mode = read_enum(input, "rotate mode", RotateMode::from_index)?;
        let rotation = input.read_f32_be()?;
        let mut position = input.read_f32_be()?;
        if position_mode.is_length() {
            position *= ctx.scale;
        }
        let mut spacing = input.read_f32_be()?;
        if spacing_mode.is_length() {
            spacing *= ctx.scale;
        }
        out.push(PathConstraint {
            name,
            order,
            bones: constrained,
            target,
            position_mode,
            spacing_mode,
            rotate_mode,
            rotation,
            position,
            spacing,
            rotate_mix: input.read_f32_be()?,
            translate_mix: input.read_f32_be()?,
        });
    }
    Ok(out)
}

fn read_skins(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    bones: &[Bone],
    slots: &[Slot],
) -> Result<(IndexMap<String, Skin>, Vec<String>), Error> {
    let mut skins = IndexMap::new();
    let mut names = Vec::new();

    if let Some(skin) = read_skin(input, ctx, bones, slots)? {
        skins.insert(DEFAULT_SKIN_NAME.to_string(), skin);
        names.push(DEFAULT_SKIN_NAME.to_string());
    }

    let count = input.read_len()?;
    for _ in 0..count {
        let name = input.read_string()?.unwrap_or_default();
        let skin = read_skin(input, ctx, bones, slots)?.unwrap_or_default();
        skins.insert(name.clone(), skin);
        names.push(name);
    }
    Ok((skins, names))
}

/// `None` when the skin has no slots (only meaningful for the default skin).
fn read_skin(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    bones: &[Bone],
    slots: &[Slot],
) -> Result<Option<Skin>, Error> {
    let slot_count = input.read_len()?;
    if slot_count == 0 {
        return Ok(None);
    }

    let mut skin = Skin::with_capacity(input.capacity(slot_count));
    for _ in 0..slot_count {
        let slot_name = read_ref(input, slots, "slot")?.name.clone();
        let attachment_count = input.read_len()?;
        let mut attachments = IndexMap::with_capacity(input.capacity(attachment_count));
        for _ in 0..attachment_count {
            let key = input.read_string()?.unwrap_or_default();
            let attachment = read_attachment(input, ctx, &key, bones, slots)?;
            attachments.insert(key, attachment);
        }
        skin.insert(slot_name, attachments);
    }
    Ok(Some(skin))
}

fn read_vertices(
    input: &mut BinaryInput<'_>,
    vertex_count: usize,
    scale: f32,
    bones: &[Bone],
) -> Result<Vertices, Error> {
    let offset = input.cursor();
    let vertices = input.read_vertices(vertex_count, scale)?;
    if let Vertices::Weighted(weighted) = &vertices {
        if let Some(w) = weighted.iter().flatten().find(|w| w.bone >= bones.len()) {
            return Err(Error::UnknownReference {
                kind: "bone",
                index: w.bone,
                len: bones.len(),
                offset,
            });
        }
    }
    Ok(vertices)
}

fn read_debug_color(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
) -> Result<Option<Color>, Error> {
    if ctx.nonessential {
        Ok(Some(input.read_color()?))
    } else {
        Ok(None)
    }
}

/// Nonessential width/height used by the editor to preview meshes.
fn read_editor_size(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
) -> Result<(Option<f32>, Option<f32>), Error> {
    if ctx.nonessential {
        Ok((
            Some(input.read_f32_be()? * ctx.scale),
            Some(input.read_f32_be()? * ctx.scale),
        ))
    } else {
        Ok((None, None))
    }
}

fn read_attachment(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    key: &str,
    bones: &[Bone],
    slots: &[Slot],
) -> Result<Attachment, Error> {
    let scale = ctx.scale;
    let name = input.read_string()?.unwrap_or_else(|| key.to_string());

    let offset = input.cursor();
    let tag = input.read_u8()?;
    let kind = AttachmentKind::from_tag(tag).ok_or(Error::InvalidValue {
        context: "attachment type",
        value: tag.into(),
        offset,
    })?;
    log::trace!("attachment {key:?} ({}) at offset {offset}", kind.as_str());

    Ok(match kind {
        AttachmentKind::Region => {
            let path = input.read_string()?.unwrap_or_else(|| name.clone());
            Attachment::Region(RegionAttachment {
                // Some exporters pad region paths with whitespace that the atlas does not carry.
                path: path.trim().to_string(),
                name,
                rotation: input.read_f32_be()?,
                x: input.read_f32_be()? * scale,
                y: input.read_f32_be()? * scale,
                scale_x: input.read_f32_be()?,
                scale_y: input.read_f32_be()?,
                width: input.read_f32_be()? * scale,
                height: input.read_f32_be()? * scale,
                color: input.read_color()?,
            })
        }
        AttachmentKind::BoundingBox => {
            let vertex_count = input.read_len()?;
            let vertices = read_vertices(input, vertex_count, scale, bones)?;
            Attachment::BoundingBox(BoundingBoxAttachment {
                name,
                vertex_count,
                vertices,
                color: read_debug_color(input, ctx)?,
            })
        }
        AttachmentKind::Mesh => {
            let path = input.read_string()?.unwrap_or_else(|| name.clone());
            let color = input.read_color()?;
            let vertex_count = input.read_len()?;
            let uvs = input.read_f32_array(vertex_count << 1, 1.0)?;
            let triangles = input.read_u16_array()?;
            let vertices = read_vertices(input, vertex_count, scale, bones)?;
            let hull = input.read_len()?;
            let edges = if ctx.nonessential {
                Some(input.read_u16_array()?)
            } else {
                None
            };
            let (width, height) = read_editor_size(input, ctx)?;
            Attachment::Mesh(MeshAttachment {
                name,
                path,
                color,
                uvs,
                triangles,
                vertices,
                hull,
                edges,
                width,
                height,
            })
        }
        AttachmentKind::LinkedMesh => {
            let path = input.read_string()?.unwrap_or_else(|| name.clone());
            let color = input.read_color()?;
            let skin = input.read_string()?;
            let parent = input.read_string()?;
            let deform = input.read_bool()?;
            let (width, height) = read_editor_size(input, ctx)?;
            Attachment::LinkedMesh(LinkedMeshAttachment {
                name,
                path,
                color,
                skin,
                parent,
                deform,
                width,
                height,
            })
        }
        AttachmentKind::Path => {
            let closed = input.read_bool()?;
            let constant_speed = input.read_bool()?;
            let vertex_count = input.read_len()?;
            let vertices = read_vertices(input, vertex_count, scale, bones)?;
            let lengths = input.read_f32_array(vertex_count / 3, scale)?;
            Attachment::Path(PathAttachment {
                name,
                closed,
                constant_speed,
                vertex_count,
                vertices,
                lengths,
                color: read_debug_color(input, ctx)?,
            })
        }
        AttachmentKind::Point => Attachment::Point(PointAttachment {
            name,
            rotation: input.read_f32_be()?,
            x: input.read_f32_be()? * scale,
            y: input.read_f32_be()? * scale,
            color: read_debug_color(input, ctx)?,
        }),
        AttachmentKind::Clipping => {
            let end = read_ref(input, slots, "slot")?.name.clone();
            let vertex_count = input.read_len()?;
            let vertices = read_vertices(input, vertex_count, scale, bones)?;
            Attachment::Clipping(ClippingAttachment {
                name,
                end,
                vertex_count,
                vertices,
                color: read_debug_color(input, ctx)?,
            })
        }
    })
}

fn read_events(
    input: &mut BinaryInput<'_>,
) -> Result<(IndexMap<String, EventData>, Vec<String>), Error> {
    let count = input.read_len()?;
    let mut events = IndexMap::with_capacity(input.capacity(count));
    let mut names = Vec::with_capacity(input.capacity(count));
    for _ in 0..count {
        let name = input.read_string()?.unwrap_or_default();
        let data = EventData {
            int_value: input.read_varint(false)?,
            float_value: input.read_f32_be()?,
            string: input.read_string()?,
        };
        events.insert(name.clone(), data);
        names.push(name);
    }
    Ok((events, names))
}
