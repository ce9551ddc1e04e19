use indexmap::IndexMap;
use serde::ser::{SerializeSeq, SerializeTuple};
use serde::{Serialize, Serializer};
use std::fmt;

/// Key of the unnamed setup skin in [`Document::skins`].
pub const DEFAULT_SKIN_NAME: &str = "default";

/// Decoded skeleton, shaped like the Spine 3.x JSON export it replaces.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Document {
    pub skeleton: Metadata,
    pub bones: Vec<Bone>,
    pub slots: Vec<Slot>,
    pub ik: Vec<IkConstraint>,
    pub transform: Vec<TransformConstraint>,
    pub path: Vec<PathConstraint>,
    pub skins: IndexMap<String, Skin>,
    pub events: IndexMap<String, EventData>,
    pub animations: IndexMap<String, Animation>,
}

impl Document {
    pub fn bone(&self, name: &str) -> Option<(usize, &Bone)> {
        self.bones.iter().enumerate().find(|(_, b)| b.name == name)
    }

    pub fn slot(&self, name: &str) -> Option<(usize, &Slot)> {
        self.slots.iter().enumerate().find(|(_, s)| s.name == name)
    }

    pub fn skin(&self, name: &str) -> Option<&Skin> {
        self.skins.get(name)
    }

    pub fn animation(&self, name: &str) -> Option<&Animation> {
        self.animations.get(name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Exporter version string, e.g. `3.6.53`.
    #[serde(rename = "spine")]
    pub version: String,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<String>,
}

/// RGBA8 color, serialized as `rrggbbaa` lowercase hex.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const WHITE: Self = Self([0xFF; 4]);

    pub fn is_white(&self) -> bool {
        *self == Self::WHITE
    }

    pub fn to_rgba_f32(&self) -> [f32; 4] {
        self.0.map(|c| c as f32 / 255.0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bone {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    // Setup transform fields are `None` when they hold their default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shear_x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shear_y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f32>,
    #[serde(flatten)]
    pub inherit: Inheritance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

/// How a bone inherits its parent's transform.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Inheritance {
    /// Exports up to 3.4.
    #[serde(rename_all = "camelCase")]
    Legacy {
        inherit_rotation: bool,
        inherit_scale: bool,
    },
    /// Exports from 3.5.
    Mode { transform: TransformMode },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformMode {
    #[default]
    Normal,
    OnlyTranslation,
    NoRotationOrReflection,
    NoScale,
    NoScaleOrReflection,
}

impl TransformMode {
    pub(crate) fn from_index(v: usize) -> Option<Self> {
        Some(match v {
            0 => Self::Normal,
            1 => Self::OnlyTranslation,
            2 => Self::NoRotationOrReflection,
            3 => Self::NoScale,
            4 => Self::NoScaleOrReflection,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Slot {
    pub name: String,
    pub bone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dark: Option<Color>,
    pub attachment: Option<String>,
    pub blend: BlendMode,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Multiply,
    Screen,
}

impl BlendMode {
    pub(crate) fn from_index(v: usize) -> Option<Self> {
        Some(match v {
            0 => Self::Normal,
            1 => Self::Additive,
            2 => Self::Multiply,
            3 => Self::Screen,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IkConstraint {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    pub bones: Vec<String>,
    pub target: String,
    pub mix: f32,
    pub bend_positive: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformConstraint {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    pub bones: Vec<String>,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative: Option<bool>,
    pub rotation: f32,
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_y: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub scale_mix: f32,
    pub shear_mix: f32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionMode {
    Fixed,
    Percent,
}

impl PositionMode {
    pub(crate) fn from_index(v: usize) -> Option<Self> {
        Some(match v {
            0 => Self::Fixed,
            1 => Self::Percent,
            _ => return None,
        })
    }

    /// Whether `position` is a length (scaled) rather than a ratio.
    pub fn is_length(self) -> bool {
        self == Self::Fixed
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpacingMode {
    Length,
    Fixed,
    Percent,
}

impl SpacingMode {
    pub(crate) fn from_index(v: usize) -> Option<Self> {
        Some(match v {
            0 => Self::Length,
            1 => Self::Fixed,
            2 => Self::Percent,
            _ => return None,
        })
    }

    /// Whether `spacing` is a length (scaled) rather than a ratio.
    pub fn is_length(self) -> bool {
        matches!(self, Self::Length | Self::Fixed)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RotateMode {
    Tangent,
    Chain,
    ChainScale,
}

impl RotateMode {
    pub(crate) fn from_index(v: usize) -> Option<Self> {
        Some(match v {
            0 => Self::Tangent,
            1 => Self::Chain,
            2 => Self::ChainScale,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathConstraint {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    pub bones: Vec<String>,
    /// Slot holding the path attachment.
    pub target: String,
    pub position_mode: PositionMode,
    pub spacing_mode: SpacingMode,
    pub rotate_mode: RotateMode,
    pub rotation: f32,
    pub position: f32,
    pub spacing: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
}

/// Attachments of one skin: slot name -> attachment key -> attachment.
pub type Skin = IndexMap<String, IndexMap<String, Attachment>>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AttachmentKind {
    Region,
    BoundingBox,
    Mesh,
    LinkedMesh,
    Path,
    Point,
    Clipping,
}

impl AttachmentKind {
    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::Region,
            1 => Self::BoundingBox,
            2 => Self::Mesh,
            3 => Self::LinkedMesh,
            4 => Self::Path,
            5 => Self::Point,
            6 => Self::Clipping,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::BoundingBox => "boundingbox",
            Self::Mesh => "mesh",
            Self::LinkedMesh => "linkedmesh",
            Self::Path => "path",
            Self::Point => "point",
            Self::Clipping => "clipping",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attachment {
    Region(RegionAttachment),
    BoundingBox(BoundingBoxAttachment),
    Mesh(MeshAttachment),
    LinkedMesh(LinkedMeshAttachment),
    Path(PathAttachment),
    Point(PointAttachment),
    Clipping(ClippingAttachment),
}

impl Attachment {
    pub fn name(&self) -> &str {
        match self {
            Attachment::Region(a) => a.name.as_str(),
            Attachment::BoundingBox(a) => a.name.as_str(),
            Attachment::Mesh(a) => a.name.as_str(),
            Attachment::LinkedMesh(a) => a.name.as_str(),
            Attachment::Path(a) => a.name.as_str(),
            Attachment::Point(a) => a.name.as_str(),
            Attachment::Clipping(a) => a.name.as_str(),
        }
    }

    pub fn kind(&self) -> AttachmentKind {
        match self {
            Attachment::Region(_) => AttachmentKind::Region,
            Attachment::BoundingBox(_) => AttachmentKind::BoundingBox,
            Attachment::Mesh(_) => AttachmentKind::Mesh,
            Attachment::LinkedMesh(_) => AttachmentKind::LinkedMesh,
            Attachment::Path(_) => AttachmentKind::Path,
            Attachment::Point(_) => AttachmentKind::Point,
            Attachment::Clipping(_) => AttachmentKind::Clipping,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionAttachment {
    pub name: String,
    pub path: String,
    pub rotation: f32,
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBoxAttachment {
    pub name: String,
    pub vertex_count: usize,
    pub vertices: Vertices,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshAttachment {
    pub name: String,
    pub path: String,
    pub color: Color,
    /// Flat `[u, v, ...]`, one pair per vertex.
    pub uvs: Vec<f32>,
    pub triangles: Vec<u16>,
    pub vertices: Vertices,
    /// Number of hull vertices.
    pub hull: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

/// Mesh sharing geometry with `parent`; resolved by the runtime, not here.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedMeshAttachment {
    pub name: String,
    pub path: String,
    pub color: Color,
    pub skin: Option<String>,
    pub parent: Option<String>,
    pub deform: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathAttachment {
    pub name: String,
    pub closed: bool,
    pub constant_speed: bool,
    pub vertex_count: usize,
    pub vertices: Vertices,
    /// One length per curve (`vertex_count / 3`).
    pub lengths: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PointAttachment {
    pub name: String,
    pub rotation: f32,
    pub x: f32,
    pub y: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClippingAttachment {
    pub name: String,
    /// Slot at which clipping stops.
    pub end: String,
    pub vertex_count: usize,
    pub vertices: Vertices,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoneInfluence {
    /// Index into [`Document::bones`].
    pub bone: usize,
    pub x: f32,
    pub y: f32,
    pub weight: f32,
}

/// Attachment vertices.
///
/// Serializes to the flat JSON layout: `[x, y, ...]` when unweighted, otherwise
/// `[boneCount, bone, x, y, weight, ..., boneCount, ...]`.
#[derive(Clone, Debug, PartialEq)]
pub enum Vertices {
    Unweighted(Vec<f32>),
    Weighted(Vec<Vec<BoneInfluence>>),
}

impl Vertices {
    pub fn is_weighted(&self) -> bool {
        matches!(self, Vertices::Weighted(_))
    }

    /// Length of the flattened numeric array.
    pub fn flat_len(&self) -> usize {
        match self {
            Vertices::Unweighted(v) => v.len(),
            Vertices::Weighted(v) => v.iter().map(|w| 1 + w.len() * 4).sum(),
        }
    }
}

impl Serialize for Vertices {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Vertices::Unweighted(v) => v.serialize(serializer),
            Vertices::Weighted(weighted) => {
                let mut seq = serializer.serialize_seq(Some(self.flat_len()))?;
                for influences in weighted {
                    seq.serialize_element(&influences.len())?;
                    for w in influences {
                        seq.serialize_element(&w.bone)?;
                        seq.serialize_element(&w.x)?;
                        seq.serialize_element(&w.y)?;
                        seq.serialize_element(&w.weight)?;
                    }
                }
                seq.end()
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EventData {
    #[serde(rename = "int")]
    pub int_value: i32,
    #[serde(rename = "float")]
    pub float_value: f32,
    pub string: Option<String>,
}

/// Interpolation from a keyframe to the next one.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub enum Curve {
    #[default]
    Linear,
    Stepped,
    Bezier {
        cx1: f32,
        cy1: f32,
        cx2: f32,
        cy2: f32,
    },
}

impl Curve {
    pub fn is_linear(&self) -> bool {
        matches!(self, Curve::Linear)
    }
}

impl Serialize for Curve {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Curve::Linear => serializer.serialize_str("linear"),
            Curve::Stepped => serializer.serialize_str("stepped"),
            Curve::Bezier { cx1, cy1, cx2, cy2 } => {
                let mut tuple = serializer.serialize_tuple(4)?;
                tuple.serialize_element(&cx1)?;
                tuple.serialize_element(&cy1)?;
                tuple.serialize_element(&cx2)?;
                tuple.serialize_element(&cy2)?;
                tuple.end()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttachmentFrame {
    pub time: f32,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColorFrame {
    pub time: f32,
    pub color: Color,
    #[serde(skip_serializing_if = "Curve::is_linear")]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TwoColorFrame {
    pub time: f32,
    pub light: Color,
    pub dark: Color,
    #[serde(skip_serializing_if = "Curve::is_linear")]
    pub curve: Curve,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotTimelines {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Vec<AttachmentFrame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Vec<ColorFrame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_color: Option<Vec<TwoColorFrame>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RotateFrame {
    pub time: f32,
    pub angle: f32,
    #[serde(skip_serializing_if = "Curve::is_linear")]
    pub curve: Curve,
}

/// Keyframe of a translate, scale or shear timeline.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Vec2Frame {
    pub time: f32,
    pub x: f32,
    pub y: f32,
    #[serde(skip_serializing_if = "Curve::is_linear")]
    pub curve: Curve,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BoneTimelines {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate: Option<Vec<RotateFrame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translate: Option<Vec<Vec2Frame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec<Vec2Frame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shear: Option<Vec<Vec2Frame>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IkFrame {
    pub time: f32,
    pub mix: f32,
    pub bend_positive: bool,
    #[serde(skip_serializing_if = "Curve::is_linear")]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformFrame {
    pub time: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub scale_mix: f32,
    pub shear_mix: f32,
    #[serde(skip_serializing_if = "Curve::is_linear")]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PositionFrame {
    pub time: f32,
    pub position: f32,
    #[serde(skip_serializing_if = "Curve::is_linear")]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpacingFrame {
    pub time: f32,
    pub spacing: f32,
    #[serde(skip_serializing_if = "Curve::is_linear")]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMixFrame {
    pub time: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    #[serde(skip_serializing_if = "Curve::is_linear")]
    pub curve: Curve,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PathTimelines {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec<PositionFrame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spacing: Option<Vec<SpacingFrame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mix: Option<Vec<PathMixFrame>>,
}

/// Sparse vertex offsets: `vertices` replace the deform values starting at `offset`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VertexDelta {
    pub offset: usize,
    pub vertices: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeformFrame {
    pub time: f32,
    /// `None` when the frame uses the setup vertices unchanged.
    #[serde(flatten)]
    pub delta: Option<VertexDelta>,
    #[serde(skip_serializing_if = "Curve::is_linear")]
    pub curve: Curve,
}

/// Skin name -> slot name -> mesh attachment key -> frames.
pub type DeformTimelines = IndexMap<String, IndexMap<String, IndexMap<String, Vec<DeformFrame>>>>;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrawOrderOffset {
    pub slot: String,
    pub offset: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrawOrderFrame {
    pub time: f32,
    pub offsets: Vec<DrawOrderOffset>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventFrame {
    pub time: f32,
    pub name: String,
    #[serde(rename = "int")]
    pub int_value: i32,
    #[serde(rename = "float")]
    pub float_value: f32,
    pub string: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Animation {
    pub slots: IndexMap<String, SlotTimelines>,
    pub bones: IndexMap<String, BoneTimelines>,
    pub ik: IndexMap<String, Vec<IkFrame>>,
    pub transform: IndexMap<String, Vec<TransformFrame>>,
    pub paths: IndexMap<String, PathTimelines>,
    pub deform: DeformTimelines,
    #[serde(rename = "drawOrder", skip_serializing_if = "Option::is_none")]
    pub draw_order: Option<Vec<DrawOrderFrame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventFrame>>,
    /// Latest keyframe time over all timelines, in seconds.
    #[serde(skip)]
    pub duration: f32,
}
