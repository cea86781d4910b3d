//! Keyframe animations: building them from the document and applying them
//! to node transforms.

use gltf::accessor::{DataType, Dimensions};
use glam::{Quat, Vec4};

use crate::accessor::AccessorView;
use crate::error::{Diagnostic, DiagnosticLog};
use crate::node::{self, Node, NodeId};
use crate::references::DanglingReferences;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    CubicSpline,
}

impl From<gltf::animation::Interpolation> for Interpolation {
    fn from(value: gltf::animation::Interpolation) -> Self {
        match value {
            gltf::animation::Interpolation::Linear => Self::Linear,
            gltf::animation::Interpolation::Step => Self::Step,
            gltf::animation::Interpolation::CubicSpline => Self::CubicSpline,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationPath {
    Translation,
    Rotation,
    Scale,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationSampler {
    pub interpolation: Interpolation,
    /// Keyframe times in seconds, ascending.
    pub inputs: Vec<f32>,
    /// Keyframe values. Three-component outputs carry `w = 0`.
    /// Cubic-spline samplers store (in-tangent, value, out-tangent) per key.
    pub outputs: Vec<Vec4>,
}

impl AnimationSampler {
    /// Interpolated value at `time`, or `None` if the sampler is inert or
    /// `time` lies outside its keyframes.
    pub fn sample(&self, time: f32, path: AnimationPath) -> Option<Vec4> {
        let keys = self.inputs.len();
        if keys < 2 || keys > self.outputs.len() {
            return None;
        }
        if self.interpolation == Interpolation::CubicSpline && self.outputs.len() < keys * 3 {
            return None;
        }

        for i in 0..keys - 1 {
            let (t0, t1) = (self.inputs[i], self.inputs[i + 1]);
            if !(time >= t0 && time <= t1) {
                continue;
            }
            let u = (time - t0).max(0.0) / (t1 - t0);
            if !(u <= 1.0) {
                continue;
            }
            return Some(match self.interpolation {
                Interpolation::Linear => self.linear(i, u, path),
                Interpolation::Step => {
                    if u < 1.0 {
                        self.outputs[i]
                    } else {
                        self.outputs[i + 1]
                    }
                }
                Interpolation::CubicSpline => self.cubic_spline(i, u, t1 - t0, path),
            });
        }
        None
    }

    fn linear(&self, i: usize, u: f32, path: AnimationPath) -> Vec4 {
        let (a, b) = (self.outputs[i], self.outputs[i + 1]);
        match path {
            AnimationPath::Rotation => {
                let q = Quat::from_vec4(a).slerp(Quat::from_vec4(b), u);
                Vec4::from(q.normalize())
            }
            AnimationPath::Translation | AnimationPath::Scale => a * (1.0 - u) + b * u,
        }
    }

    fn cubic_spline(&self, i: usize, u: f32, delta: f32, path: AnimationPath) -> Vec4 {
        let v0 = self.outputs[i * 3 + 1];
        let out0 = self.outputs[i * 3 + 2];
        let in1 = self.outputs[(i + 1) * 3];
        let v1 = self.outputs[(i + 1) * 3 + 1];

        let u2 = u * u;
        let u3 = u2 * u;
        let value = v0 * (2.0 * u3 - 3.0 * u2 + 1.0)
            + out0 * delta * (u3 - 2.0 * u2 + u)
            + v1 * (-2.0 * u3 + 3.0 * u2)
            + in1 * delta * (u3 - u2);

        match path {
            AnimationPath::Rotation => Vec4::from(Quat::from_vec4(value).normalize()),
            AnimationPath::Translation | AnimationPath::Scale => value,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationChannel {
    pub path: AnimationPath,
    pub sampler: usize,
    pub node: NodeId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    pub name: String,
    pub samplers: Vec<AnimationSampler>,
    pub channels: Vec<AnimationChannel>,
    pub start: f32,
    pub end: f32,
}

impl Animation {
    /// Applies every channel at `time` to the node transforms.
    /// Returns whether any node changed. World matrices are not updated.
    pub fn apply(&self, nodes: &mut [Node], time: f32) -> bool {
        let mut touched = false;
        for channel in &self.channels {
            let Some(sampler) = self.samplers.get(channel.sampler) else {
                continue;
            };
            let Some(value) = sampler.sample(time, channel.path) else {
                continue;
            };
            let Some(node) = nodes.get_mut(channel.node.0) else {
                continue;
            };
            match channel.path {
                AnimationPath::Translation => node.translation = value.truncate(),
                AnimationPath::Rotation => node.rotation = Quat::from_vec4(value),
                AnimationPath::Scale => node.scale = value.truncate(),
            }
            touched = true;
        }
        touched
    }

    pub fn duration(&self) -> f32 {
        self.end - self.start
    }
}

pub(crate) fn load_animations(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    nodes: &[Node],
    roots: &[NodeId],
    dangling: &DanglingReferences,
    diagnostics: &mut DiagnosticLog,
) -> Vec<Animation> {
    document
        .animations()
        .map(|animation| {
            let targets = dangling.channel_targets(animation.index());
            load_animation(&animation, buffers, nodes, roots, targets, diagnostics)
        })
        .collect()
}

fn load_animation(
    animation: &gltf::Animation<'_>,
    buffers: &[gltf::buffer::Data],
    nodes: &[Node],
    roots: &[NodeId],
    missing_targets: &[usize],
    diagnostics: &mut DiagnosticLog,
) -> Animation {
    let name = match animation.name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => animation.index().to_string(),
    };
    let context = format!("animation '{name}'");

    let mut start = f32::MAX;
    let mut end = f32::MIN;
    let mut samplers = Vec::new();
    for sampler in animation.samplers() {
        let mut out = AnimationSampler {
            interpolation: sampler.interpolation().into(),
            ..Default::default()
        };

        match AccessorView::resolve(&sampler.input(), buffers) {
            Some(view) if view.is(DataType::F32, Dimensions::Scalar) => {
                out.inputs = view.iter_f32::<1>().map(|[t]| t).collect();
            }
            Some(view) => diagnostics.report(Diagnostic::encoding(
                &context,
                format!("sampler input stored as {}", view.layout()),
            )),
            None => diagnostics.report(Diagnostic::encoding(&context, "sampler input unreadable")),
        }
        for &t in &out.inputs {
            start = start.min(t);
            end = end.max(t);
        }

        match AccessorView::resolve(&sampler.output(), buffers) {
            Some(view) if view.is(DataType::F32, Dimensions::Vec3) => {
                out.outputs = view.iter_f32::<3>().map(|[x, y, z]| Vec4::new(x, y, z, 0.0)).collect();
            }
            Some(view) if view.is(DataType::F32, Dimensions::Vec4) => {
                out.outputs = view.iter_f32::<4>().map(Vec4::from_array).collect();
            }
            Some(view) => diagnostics.report(Diagnostic::encoding(
                &context,
                format!("sampler output stored as {}", view.layout()),
            )),
            None => diagnostics.report(Diagnostic::encoding(&context, "sampler output unreadable")),
        }
        samplers.push(out);
    }
    if start > end {
        start = 0.0;
        end = 0.0;
    }

    for target in missing_targets {
        diagnostics.report(Diagnostic::unresolved(&context, format!("channel target node {target}")));
    }
    let mut channels = Vec::new();
    for channel in animation.channels() {
        let target = channel.target();
        let path = match target.property() {
            gltf::animation::Property::Translation => AnimationPath::Translation,
            gltf::animation::Property::Rotation => AnimationPath::Rotation,
            gltf::animation::Property::Scale => AnimationPath::Scale,
            gltf::animation::Property::MorphTargetWeights => {
                log::warn!("{context}: morph target weights are not supported, channel skipped");
                continue;
            }
        };
        let Some(node) = node::find_by_index(nodes, roots, target.node().index()) else {
            diagnostics.report(Diagnostic::unresolved(
                &context,
                format!("channel target node {}", target.node().index()),
            ));
            continue;
        };
        channels.push(AnimationChannel {
            path,
            sampler: channel.sampler().index(),
            node,
        });
    }

    log::debug!(
        "{context}: {} samplers, {} channels, {}s..{}s",
        samplers.len(),
        channels.len(),
        start,
        end
    );
    Animation {
        name,
        samplers,
        channels,
        start,
        end,
    }
}
