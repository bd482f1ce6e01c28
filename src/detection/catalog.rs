//! 贵重物品目录 (Valuable-item catalog)
//!
//! 类别ID → 标签, 启动时加载一次, 之后只读.

use std::collections::BTreeMap;

use phf::phf_map;

use super::types::Detection;

/// 默认贵重物品类别 (Object365 类别ID, 按需调整)
static DEFAULT_VALUABLE_ITEMS: phf::Map<u32, &'static str> = phf_map! {
    // 电子产品
    50u32 => "手机",
    51u32 => "笔记本电脑",
    52u32 => "平板电脑",
    53u32 => "相机",
    54u32 => "耳机",
    // 配饰
    100u32 => "手提包",
    101u32 => "钱包",
    102u32 => "手表",
    // 服装
    200u32 => "外套",
    201u32 => "运动鞋",
    202u32 => "夹克",
    // 化妆品
    300u32 => "香水",
    301u32 => "化妆品",
    // 酒水/食品
    350u32 => "葡萄酒",
    351u32 => "威士忌",
    352u32 => "高档巧克力",
};

/// 默认目录 (有序, 便于序列化到配置文件)
pub fn default_valuable_items() -> BTreeMap<u32, String> {
    DEFAULT_VALUABLE_ITEMS
        .entries()
        .map(|(id, label)| (*id, (*label).to_string()))
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValuableItemCatalog {
    items: BTreeMap<u32, String>,
}

impl ValuableItemCatalog {
    pub fn new(items: BTreeMap<u32, String>) -> Self {
        Self { items }
    }

    pub fn label(&self, class_id: u32) -> Option<&str> {
        self.items.get(&class_id).map(String::as_str)
    }

    pub fn contains(&self, class_id: u32) -> bool {
        self.items.contains_key(&class_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 过滤出当前帧中的贵重物品
    pub fn filter<'a>(&self, detections: &'a [Detection]) -> Vec<&'a Detection> {
        detections
            .iter()
            .filter(|d| self.contains(d.class_id()))
            .collect()
    }
}

impl FromIterator<(u32, String)> for ValuableItemCatalog {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
