//! Skinned model files (characters and 3D backgrounds).
//!
//! Layout (little-endian): magic `MDL1`, bone/mesh/animation counts, bones, meshes,
//! then an animation table of `(id, absolute offset, length)` entries. Each table entry
//! points at an animation blob decoded by [`Animation::load`] with this model as context.

use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::animation::Animation;
use crate::error::{AssetError, Result};
use crate::reader::{
    capacity_hint, read_exact_array, read_f32, read_i16, read_quat, read_u8, read_u16, read_u32,
    read_vec2, read_vec3, write_f32, write_i16, write_quat, write_u16, write_u32, write_vec3,
};

pub const MODEL_MAGIC: [u8; 4] = *b"MDL1";

/// Upper bound on bones per model, and therefore on tracks per animation.
pub const MAX_BONES: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bone {
    pub parent: Option<u16>,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Bone {
    pub fn root() -> Self {
        Self {
            parent: None,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn rest_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub bone_indices: [u8; 4],
    pub bone_weights: [f32; 4],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

#[derive(Debug, Clone)]
pub struct Model {
    pub id: u32,
    pub bones: Vec<Bone>,
    pub meshes: Vec<Mesh>,
    animations: Vec<Arc<Animation>>,
}

impl Model {
    pub fn new(id: u32, bones: Vec<Bone>, meshes: Vec<Mesh>) -> Self {
        Self {
            id,
            bones,
            meshes,
            animations: Vec::new(),
        }
    }

    /// Attaches a clip, replacing any clip with the same ID.
    pub fn with_animation(mut self, animation: Animation) -> Self {
        self.animations.retain(|a| a.id != animation.id);
        self.animations.push(Arc::new(animation));
        self
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn animations(&self) -> &[Arc<Animation>] {
        &self.animations
    }

    pub fn animation(&self, id: u16) -> Option<&Arc<Animation>> {
        self.animations.iter().find(|a| a.id == id)
    }

    pub fn load(bytes: &[u8], id: u32) -> Result<Self> {
        let mut stream = Cursor::new(bytes);

        let magic = read_exact_array::<4, _>(&mut stream)?;
        if magic != MODEL_MAGIC {
            return Err(AssetError::BadMagic {
                expected: MODEL_MAGIC,
                found: magic,
            });
        }

        let bone_count = read_u32(&mut stream)? as usize;
        let mesh_count = read_u32(&mut stream)? as usize;
        let animation_count = read_u32(&mut stream)? as usize;

        if bone_count > MAX_BONES {
            return Err(AssetError::TooManyBones {
                count: bone_count,
                max: MAX_BONES,
            });
        }

        let mut bones = Vec::with_capacity(bone_count);
        for index in 0..bone_count {
            bones.push(read_bone(&mut stream, index)?);
        }

        let mut meshes = Vec::with_capacity(capacity_hint(mesh_count));
        for mesh_index in 0..mesh_count {
            meshes.push(read_mesh(&mut stream, mesh_index, bone_count)?);
        }

        let mut model = Model::new(id, bones, meshes);

        let mut table = Vec::with_capacity(capacity_hint(animation_count));
        for _ in 0..animation_count {
            let anim_id = read_u16(&mut stream)?;
            let offset = read_u32(&mut stream)?;
            let length = read_u32(&mut stream)?;
            table.push((anim_id, offset, length));
        }

        let mut animations = Vec::with_capacity(table.len());
        for (anim_id, offset, length) in table {
            let start = offset as usize;
            let blob = start
                .checked_add(length as usize)
                .and_then(|end| bytes.get(start..end))
                .ok_or(AssetError::AnimationOutOfBounds {
                    id: anim_id,
                    offset,
                    length,
                })?;
            let animation = Animation::load(&mut Cursor::new(blob), &model, anim_id)?;
            animations.push(Arc::new(animation));
        }
        model.animations = animations;

        Ok(model)
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut body = Vec::new();
        for bone in &self.bones {
            write_i16(&mut body, bone.parent.map_or(-1, |p| p as i16))?;
            write_u16(&mut body, 0)?;
            write_vec3(&mut body, bone.translation)?;
            write_quat(&mut body, bone.rotation)?;
            write_vec3(&mut body, bone.scale)?;
        }
        for mesh in &self.meshes {
            write_u32(&mut body, mesh.vertices.len() as u32)?;
            write_u32(&mut body, mesh.indices.len() as u32)?;
            for v in &mesh.vertices {
                write_vec3(&mut body, v.position)?;
                write_vec3(&mut body, v.normal)?;
                write_f32(&mut body, v.uv.x)?;
                write_f32(&mut body, v.uv.y)?;
                body.extend_from_slice(&v.bone_indices);
                for w in v.bone_weights {
                    write_f32(&mut body, w)?;
                }
            }
            for index in &mesh.indices {
                write_u16(&mut body, *index)?;
            }
        }

        let mut blobs = Vec::with_capacity(self.animations.len());
        for animation in &self.animations {
            let mut blob = Vec::new();
            animation.write(&mut blob)?;
            blobs.push((animation.id, blob));
        }

        const HEADER_LEN: usize = 16;
        const TABLE_ENTRY_LEN: usize = 10;
        let mut next_offset = HEADER_LEN + body.len() + TABLE_ENTRY_LEN * blobs.len();

        writer.write_all(&MODEL_MAGIC)?;
        write_u32(writer, self.bones.len() as u32)?;
        write_u32(writer, self.meshes.len() as u32)?;
        write_u32(writer, blobs.len() as u32)?;
        writer.write_all(&body)?;
        for (anim_id, blob) in &blobs {
            write_u16(writer, *anim_id)?;
            write_u32(writer, next_offset as u32)?;
            write_u32(writer, blob.len() as u32)?;
            next_offset += blob.len();
        }
        for (_, blob) in &blobs {
            writer.write_all(blob)?;
        }
        Ok(())
    }
}

fn read_bone<R: Read>(stream: &mut R, index: usize) -> Result<Bone> {
    let parent = read_i16(stream)?;
    let _pad = read_u16(stream)?;
    let translation = read_vec3(stream)?;
    let rotation = read_quat(stream)?;
    let scale = read_vec3(stream)?;

    // Parents precede children so poses can be composed in one forward pass.
    let parent = match parent {
        p if p < 0 => None,
        p if (p as usize) < index => Some(p as u16),
        p => {
            return Err(AssetError::BoneOutOfRange {
                bone: p as usize,
                bone_count: index,
            });
        }
    };

    Ok(Bone {
        parent,
        translation,
        rotation,
        scale,
    })
}

fn read_mesh<R: Read>(stream: &mut R, mesh: usize, bone_count: usize) -> Result<Mesh> {
    let vertex_count = read_u32(stream)? as usize;
    let index_count = read_u32(stream)? as usize;

    let mut vertices = Vec::with_capacity(capacity_hint(vertex_count));
    for _ in 0..vertex_count {
        let position = read_vec3(stream)?;
        let normal = read_vec3(stream)?;
        let uv = read_vec2(stream)?;
        let mut bone_indices = [0u8; 4];
        for slot in &mut bone_indices {
            *slot = read_u8(stream)?;
        }
        let mut bone_weights = [0f32; 4];
        for slot in &mut bone_weights {
            *slot = read_f32(stream)?;
        }

        for (bone, weight) in bone_indices.iter().zip(bone_weights) {
            if weight != 0.0 && *bone as usize >= bone_count {
                return Err(AssetError::BoneOutOfRange {
                    bone: *bone as usize,
                    bone_count,
                });
            }
        }

        vertices.push(Vertex {
            position,
            normal,
            uv,
            bone_indices,
            bone_weights,
        });
    }

    let mut indices = Vec::with_capacity(capacity_hint(index_count));
    for _ in 0..index_count {
        let index = read_u16(stream)?;
        if index as usize >= vertex_count {
            return Err(AssetError::IndexOutOfRange {
                mesh,
                index,
                vertex_count,
            });
        }
        indices.push(index);
    }

    Ok(Mesh { vertices, indices })
}
