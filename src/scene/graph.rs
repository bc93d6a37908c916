use glam::Mat4;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::scene::NodeHandle;
use crate::scene::node::Node;

/// 导入场景图
///
/// 存储外部加载器产出的变换层级。骨架构建过程只读访问它，
/// 所有构建期数据都放在独立的侧表中，因此同一个场景图可以
/// 同时被多次骨架构建使用。
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeHandle, Node>,
    root_nodes: Vec<NodeHandle>,
    /// 名称索引：重名时后加入的节点覆盖先前的
    names: FxHashMap<String, NodeHandle>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个节点到场景 (默认放在根节点)
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let name = node.name.clone();
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        self.names.insert(name, handle);
        handle
    }

    /// 添加一个节点并挂到指定父节点下
    pub fn add_to_parent(&mut self, mut child: Node, parent: NodeHandle) -> NodeHandle {
        if !self.nodes.contains_key(parent) {
            log::error!("Parent node not found, adding '{}' as a root", child.name);
            return self.add_node(child);
        }

        let name = child.name.clone();
        child.parent = Some(parent);
        let handle = self.nodes.insert(child);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(handle);
        }
        self.names.insert(name, handle);
        handle
    }

    /// 核心逻辑：建立父子关系 (Attach)
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return;
        }
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            log::error!("Node not found during attach!");
            return;
        }
        if self.ancestors(parent).any(|a| a == child) {
            log::warn!("Cannot attach node to its own descendant!");
            return;
        }

        // 1. Detach from old
        let old_parent = self.nodes.get(child).and_then(|n| n.parent);
        if let Some(p) = old_parent {
            if let Some(n) = self.nodes.get_mut(p)
                && let Some(i) = n.children.iter().position(|&x| x == child)
            {
                n.children.remove(i);
            }
        } else if let Some(i) = self.root_nodes.iter().position(|&x| x == child) {
            self.root_nodes.remove(i);
        }

        // 2. Attach to new
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
    }

    /// 获取只读引用
    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    /// 获取可变引用 (用于修改 TRS)
    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[must_use]
    pub fn name(&self, handle: NodeHandle) -> Option<&str> {
        self.nodes.get(handle).map(|n| n.name.as_str())
    }

    /// 按名称查找节点
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.names.get(name).copied()
    }

    #[must_use]
    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(handle).and_then(Node::parent)
    }

    #[must_use]
    pub fn root_nodes(&self) -> &[NodeHandle] {
        &self.root_nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 向上遍历祖先（不含自身），由近及远
    pub fn ancestors(&self, handle: NodeHandle) -> impl Iterator<Item = NodeHandle> + '_ {
        std::iter::successors(self.parent(handle), move |&h| self.parent(h))
    }

    /// 先序遍历（父节点先于子节点，兄弟按插入顺序）
    #[must_use]
    pub fn traverse_pre_order(&self) -> Vec<NodeHandle> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeHandle> = self.root_nodes.iter().rev().copied().collect();

        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else {
                continue;
            };
            order.push(handle);
            // 逆序入栈以保持处理顺序
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// 计算节点的世界矩阵（沿祖先链累乘局部矩阵）
    #[must_use]
    pub fn world_matrix(&self, handle: NodeHandle) -> Option<Mat4> {
        let mut world = self.nodes.get(handle)?.transform.local_matrix();
        for ancestor in self.ancestors(handle) {
            world = self.nodes.get(ancestor)?.transform.local_matrix() * world;
        }
        Some(world)
    }
}
