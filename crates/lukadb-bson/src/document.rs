//! BSON 文档结构模块
//!
//! 提供 Document / Array 两种容器。两者共享同一种有序条目表示:
//! 数组即键为 "0", "1", ... 的文档,区别只在编码时的类型标记。
//! 线格式允许重复键,因此条目存放在 Vec 中,插入始终追加,
//! 按键查找返回第一个匹配。

use crate::value::BsonValue;
use crate::BsonResult;
use compact_str::{CompactString, ToCompactString};

/// BSON 文档结构
///
/// 一个有序的键值条目序列,保持插入顺序,允许重复键。
/// 编码/解码保证条目顺序与线上字节顺序完全一致。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    entries: Vec<(CompactString, BsonValue)>,
}

impl Document {
    /// 创建新文档
    ///
    /// # Brief
    /// 创建一个空文档
    ///
    /// # Returns
    /// 新的 Document 实例
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// 插入字段
    ///
    /// # Brief
    /// 向文档末尾追加一个字段;与线格式一致,重复键会被保留,
    /// 不会覆盖已有条目
    ///
    /// # Arguments
    /// * `key` - 字段名
    /// * `value` - 字段值
    pub fn insert(&mut self, key: impl Into<CompactString>, value: impl Into<BsonValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// 获取字段值
    ///
    /// # Brief
    /// 根据字段名获取值的引用;存在重复键时返回第一个匹配
    ///
    /// # Arguments
    /// * `key` - 字段名
    ///
    /// # Returns
    /// `Some(&BsonValue)` 如果字段存在,否则 `None`
    pub fn get(&self, key: &str) -> Option<&BsonValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    /// 获取字段的可变引用
    ///
    /// # Brief
    /// 根据字段名获取值的可变引用;存在重复键时返回第一个匹配
    ///
    /// # Arguments
    /// * `key` - 字段名
    ///
    /// # Returns
    /// `Some(&mut BsonValue)` 如果字段存在,否则 `None`
    pub fn get_mut(&mut self, key: &str) -> Option<&mut BsonValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    /// 移除字段
    ///
    /// # Brief
    /// 移除第一个匹配的字段并返回其值
    ///
    /// # Arguments
    /// * `key` - 字段名
    ///
    /// # Returns
    /// `Some(BsonValue)` 如果字段存在,否则 `None`
    pub fn remove(&mut self, key: &str) -> Option<BsonValue> {
        let pos = self.entries.iter().position(|(k, _)| k.as_str() == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// 检查字段是否存在
    ///
    /// # Brief
    /// 判断文档中是否包含指定字段
    ///
    /// # Arguments
    /// * `key` - 字段名
    ///
    /// # Returns
    /// 如果字段存在返回 `true`
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.as_str() == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &BsonValue> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BsonValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(|v| v.as_i32())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_array(&self, key: &str) -> Option<&Array> {
        self.get(key).and_then(|v| v.as_array())
    }

    pub fn get_document(&self, key: &str) -> Option<&Document> {
        self.get(key).and_then(|v| v.as_document())
    }

    pub fn get_object_id(&self, key: &str) -> Option<lukadb_common::ObjectId> {
        self.get(key).and_then(|v| v.as_object_id())
    }

    /// 按路径获取嵌套值
    ///
    /// # Brief
    /// 使用点分隔的路径访问嵌套文档中的值
    ///
    /// # Arguments
    /// * `path` - 点分隔的路径,如 "user.address.city"
    ///
    /// # Returns
    /// `Some(&BsonValue)` 如果路径存在,否则 `None`
    pub fn get_path(&self, path: &str) -> Option<&BsonValue> {
        let mut parts = path.split('.');
        let mut current = self.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// 编码为字节序列
    ///
    /// # Brief
    /// 将文档编码为完整的 BSON 字节序列
    ///
    /// # Returns
    /// 成功返回编码后的字节,失败返回编码错误
    pub fn to_bytes(&self) -> BsonResult<Vec<u8>> {
        crate::codec::encode_to_vec(self)
    }

    /// 从字节序列解码
    ///
    /// # Brief
    /// 将一段完整的 BSON 字节序列物化为文档
    ///
    /// # Arguments
    /// * `data` - 编码后的文档字节
    ///
    /// # Returns
    /// 成功返回 Document,失败返回解码错误
    pub fn from_bytes(data: &[u8]) -> BsonResult<Self> {
        crate::codec::decode(data)
    }

    /// 从 JSON 字符串创建文档
    ///
    /// # Brief
    /// 解析 JSON 字符串(支持 `$oid`/`$date` 等扩展记法)并创建文档
    ///
    /// # Arguments
    /// * `json` - JSON 格式的字符串
    ///
    /// # Returns
    /// 成功返回 Document,失败返回解析错误
    pub fn from_json(json: &str) -> BsonResult<Self> {
        crate::json::from_json_string(json)
    }

    /// 转换为 JSON 字符串
    ///
    /// # Brief
    /// 将文档序列化为紧凑的 JSON 字符串(扩展记法)
    ///
    /// # Returns
    /// JSON 格式的字符串
    pub fn to_json(&self) -> String {
        crate::json::to_json_string(self)
    }

    /// 转换为格式化的 JSON 字符串
    ///
    /// # Brief
    /// 将文档序列化为带缩进的 JSON 字符串(扩展记法)
    ///
    /// # Returns
    /// 格式化的 JSON 字符串
    pub fn to_json_pretty(&self) -> String {
        crate::json::to_json_string_pretty(self)
    }
}

impl IntoIterator for Document {
    type Item = (CompactString, BsonValue);
    type IntoIter = std::vec::IntoIter<(CompactString, BsonValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(CompactString, BsonValue)> for Document {
    fn from_iter<I: IntoIterator<Item = (CompactString, BsonValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// BSON 数组结构
///
/// 与 Document 共享表示:数组在线上就是键为 "0", "1", ... 的文档,
/// 只是类型标记不同。`push` 自动生成下标键,`get` 按下标翻译回
/// 字符串键查找。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array(Document);

impl Array {
    /// 创建新数组
    ///
    /// # Brief
    /// 创建一个空数组
    ///
    /// # Returns
    /// 新的 Array 实例
    pub fn new() -> Self {
        Self(Document::new())
    }

    /// 追加元素
    ///
    /// # Brief
    /// 向数组末尾追加一个元素,键为当前长度的十进制字符串
    ///
    /// # Arguments
    /// * `value` - 元素值
    pub fn push(&mut self, value: impl Into<BsonValue>) {
        let key = self.0.len().to_compact_string();
        self.0.insert(key, value);
    }

    /// 按下标获取元素
    ///
    /// # Brief
    /// 将下标翻译为字符串键后查找
    ///
    /// # Arguments
    /// * `index` - 元素下标
    ///
    /// # Returns
    /// `Some(&BsonValue)` 如果存在,否则 `None`
    pub fn get(&self, index: usize) -> Option<&BsonValue> {
        self.0.get(index.to_compact_string().as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &BsonValue> {
        self.0.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BsonValue)> {
        self.0.iter()
    }

    /// 从文档创建数组
    ///
    /// # Brief
    /// 直接复用文档的条目作为数组内容;解码嵌套数组时使用,
    /// 线上读到的下标键原样保留
    ///
    /// # Arguments
    /// * `doc` - 条目来源
    ///
    /// # Returns
    /// 新的 Array 实例
    pub fn from_document(doc: Document) -> Self {
        Self(doc)
    }

    pub fn as_document(&self) -> &Document {
        &self.0
    }

    pub fn into_document(self) -> Document {
        self.0
    }
}

impl IntoIterator for Array {
    type Item = (CompactString, BsonValue);
    type IntoIter = std::vec::IntoIter<(CompactString, BsonValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// 构造 Document 的便捷宏
///
/// # 示例
///
/// ```rust,ignore
/// use lukadb_bson::doc;
///
/// let empty = doc!();
/// let doc = doc! {
///     "name": "test",
///     "value": 123
/// };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            let mut doc = $crate::Document::new();
            $(
                doc.insert($key, $crate::bson!($value));
            )*
            doc
        }
    };
}
