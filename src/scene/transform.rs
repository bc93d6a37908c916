use glam::{Mat4, Quat, Vec3};

/// Transform 组件
///
/// 导入场景中节点的局部变换（位置、旋转、缩放）。
/// 骨架构建只读取位置和旋转，缩放保留用于世界矩阵求值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn new() -> Self {
        Self::IDENTITY
    }

    /// 由位置和旋转构造（缩放为 1）
    #[must_use]
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Self::IDENTITY
        }
    }

    /// 由导入数据的原始数组构造：位置 `[x, y, z]`，旋转 `[x, y, z, w]`
    ///
    /// 旋转不做归一化，退化四元数按原样保留。
    #[must_use]
    pub fn from_arrays(position: [f32; 3], rotation: [f32; 4]) -> Self {
        Self::from_position_rotation(Vec3::from_array(position), Quat::from_array(rotation))
    }

    /// 计算局部矩阵
    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
