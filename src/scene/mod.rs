//! 导入场景图模块
//!
//! 外部加载器产出的只读输入：
//! - Node: 变换节点（名称、局部变换、父子关系）
//! - Transform: 局部位置、旋转、缩放
//! - SceneGraph: 节点容器，支持按名称查找和祖先遍历
//! - Skin: 蒙皮描述（网格引用、骨骼名称、绑定姿态矩阵）

pub mod graph;
pub mod node;
pub mod skin;
pub mod transform;

// 重新导出常用类型
pub use graph::SceneGraph;
pub use node::Node;
pub use skin::{BoneWeight, Skin, SkinBinding};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
}
