use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

/// Viewer settings. Every field has a default, so an empty `<viewer/>`
/// document yields the stock keycap scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// sRGB clear color.
    pub background: Vec3,
    pub camera: CameraConfig,
    pub hemisphere: HemisphereLightConfig,
    pub directional: DirectionalLightConfig,
    pub ground: GroundConfig,
    /// Exposure fed to the ACES filmic tone mapper.
    pub exposure: f32,
    pub model: ModelConfig,
    pub press: ClipConfig,
    pub release: ClipConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            background: Vec3::ONE,
            camera: CameraConfig::default(),
            hemisphere: HemisphereLightConfig::default(),
            directional: DirectionalLightConfig::default(),
            ground: GroundConfig::default(),
            exposure: 1.0,
            model: ModelConfig::default(),
            press: ClipConfig {
                duration: 0.1,
                travel: 0.1,
            },
            release: ClipConfig {
                duration: 0.05,
                travel: 0.1,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 45.0,
            near: 0.1,
            far: 90.0,
            position: Vec3::new(0.0, 7.0, 0.0),
            target: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HemisphereLightConfig {
    pub sky_color: Vec3,
    pub ground_color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
}

impl Default for HemisphereLightConfig {
    fn default() -> Self {
        Self {
            sky_color: hex_color(0xafafaf),
            ground_color: hex_color(0x101010),
            intensity: 1.0,
            position: Vec3::new(0.0, 8.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLightConfig {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub cast_shadow: bool,
    pub shadow: ShadowConfig,
}

impl Default for DirectionalLightConfig {
    fn default() -> Self {
        Self {
            color: hex_color(0xb59fa0),
            intensity: 2.0,
            position: Vec3::new(-3.0, 8.0, 2.0),
            target: Vec3::ZERO,
            cast_shadow: true,
            shadow: ShadowConfig::default(),
        }
    }
}

impl DirectionalLightConfig {
    /// Unit vector pointing from the lit surface towards the light.
    pub fn direction(&self) -> Vec3 {
        (self.position - self.target).normalize_or_zero()
    }
}

/// Shadow-map settings of the key light. Informational: the renderer
/// draws no shadow pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowConfig {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    pub radius: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_size: 2048,
            near: 0.1,
            far: 20.0,
            radius: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundConfig {
    /// Edge length of the square ground plane.
    pub size: f32,
    pub color: Vec3,
    /// Material hints kept with the scene; the Lambert shader ignores them.
    pub metalness: f32,
    pub roughness: f32,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            size: 20.0,
            color: hex_color(0x1a342a),
            metalness: 0.0,
            roughness: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: String,
    /// Rotation around the world Y axis in degrees.
    pub rotation_y: f32,
    pub scale: f32,
    pub interactive_part: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "sa_keycap-7deg.glb".to_string(),
            rotation_y: 180.0,
            scale: 1.0,
            interactive_part: "sa_low".to_string(),
        }
    }
}

/// Timing of one keyframe clip: how long it runs and how far it moves the part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipConfig {
    pub duration: f32,
    pub travel: f32,
}

impl ViewerConfig {
    /// Parses a `<viewer>` document, falling back to defaults for anything absent.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid viewer XML")?;
        let root = document.root_element();
        if !root.has_tag_name("viewer") {
            return Err(anyhow!(
                "expected <viewer> root element, found <{}>",
                root.tag_name().name()
            ));
        }

        let mut config = Self::default();
        config.background = parse_color(optional_text(&root, "background"), config.background)?;
        config.exposure = parse_f32(optional_text(&root, "exposure"), config.exposure)?;

        if let Some(node) = child(&root, "camera") {
            let camera = &mut config.camera;
            camera.fov = parse_f32(optional_text(&node, "fov"), camera.fov)?;
            camera.near = parse_f32(optional_text(&node, "near"), camera.near)?;
            camera.far = parse_f32(optional_text(&node, "far"), camera.far)?;
            camera.position = parse_vec3(optional_text(&node, "position"), camera.position)?;
            camera.target = parse_vec3(optional_text(&node, "target"), camera.target)?;
            if camera.near <= 0.0 || camera.far <= camera.near {
                return Err(anyhow!(
                    "camera clip planes must satisfy 0 < near < far (near={}, far={})",
                    camera.near,
                    camera.far
                ));
            }
        }

        if let Some(node) = child(&root, "hemisphere") {
            let light = &mut config.hemisphere;
            light.sky_color = parse_color(optional_text(&node, "sky"), light.sky_color)?;
            light.ground_color = parse_color(optional_text(&node, "ground"), light.ground_color)?;
            light.intensity = parse_f32(optional_text(&node, "intensity"), light.intensity)?;
            light.position = parse_vec3(optional_text(&node, "position"), light.position)?;
        }

        if let Some(node) = child(&root, "directional") {
            let light = &mut config.directional;
            light.color = parse_color(optional_text(&node, "color"), light.color)?;
            light.intensity = parse_f32(optional_text(&node, "intensity"), light.intensity)?;
            light.position = parse_vec3(optional_text(&node, "position"), light.position)?;
            light.target = parse_vec3(optional_text(&node, "target"), light.target)?;
            light.cast_shadow =
                parse_bool(optional_text(&node, "cast-shadow"), light.cast_shadow)?;
            if let Some(shadow) = child(&node, "shadow") {
                let settings = &mut light.shadow;
                settings.map_size =
                    parse_u32(optional_text(&shadow, "map-size"), settings.map_size)?;
                settings.near = parse_f32(optional_text(&shadow, "near"), settings.near)?;
                settings.far = parse_f32(optional_text(&shadow, "far"), settings.far)?;
                settings.radius = parse_f32(optional_text(&shadow, "radius"), settings.radius)?;
            }
        }

        if let Some(node) = child(&root, "ground") {
            let ground = &mut config.ground;
            ground.size = parse_f32(optional_text(&node, "size"), ground.size)?;
            ground.color = parse_color(optional_text(&node, "color"), ground.color)?;
            ground.metalness = parse_f32(optional_text(&node, "metalness"), ground.metalness)?;
            ground.roughness = parse_f32(optional_text(&node, "roughness"), ground.roughness)?;
        }

        if let Some(node) = child(&root, "model") {
            let model = &mut config.model;
            if let Some(path) = optional_text(&node, "path") {
                model.path = path;
            }
            model.rotation_y = parse_f32(optional_text(&node, "rotation-y"), model.rotation_y)?;
            model.scale = parse_f32(optional_text(&node, "scale"), model.scale)?;
            if let Some(part) = optional_text(&node, "interactive-part") {
                model.interactive_part = part;
            }
        }

        config.press = parse_clip(child(&root, "press"), config.press).context("in <press>")?;
        config.release =
            parse_clip(child(&root, "release"), config.release).context("in <release>")?;

        Ok(config)
    }
}

/// Converts a packed `0xRRGGBB` value into an sRGB color in `[0, 1]`.
pub fn hex_color(value: u32) -> Vec3 {
    Vec3::new(
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    )
}

fn parse_clip(node: Option<Node<'_, '_>>, default: ClipConfig) -> Result<ClipConfig> {
    let Some(node) = node else {
        return Ok(default);
    };
    let duration = parse_f32(optional_text(&node, "duration"), default.duration)?;
    let travel = parse_f32(optional_text(&node, "travel"), default.travel)?;
    if duration <= 0.0 {
        return Err(anyhow!("clip duration must be positive, got {duration}"));
    }
    Ok(ClipConfig { duration, travel })
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let numbers = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("invalid vector component {component:?}: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    match numbers.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(anyhow!("vector needs 3 components, got {:?}", value)),
    }
}

/// Accepts `#rrggbb`, `0xrrggbb`, or three 0-255 components.
fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    if let Some(hex) = value
        .strip_prefix('#')
        .or_else(|| value.strip_prefix("0x"))
    {
        let packed = u32::from_str_radix(hex, 16)
            .map_err(|err| anyhow!("invalid hex color {value:?}: {err}"))?;
        if hex.len() != 6 {
            return Err(anyhow!("hex color {value:?} must have 6 digits"));
        }
        return Ok(hex_color(packed));
    }
    let rgb = parse_vec3(Some(value), Vec3::ZERO).context("color is missing components")?;
    Ok(rgb / 255.0)
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float {value:?}: {err}")),
        None => Ok(default),
    }
}

fn parse_u32(value: Option<String>, default: u32) -> Result<u32> {
    match value {
        Some(value) => value
            .parse::<u32>()
            .map_err(|err| anyhow!("failed to parse integer {value:?}: {err}")),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref() {
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(anyhow!("expected true or false, got {other:?}")),
        None => Ok(default),
    }
}
