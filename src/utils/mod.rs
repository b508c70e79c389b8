pub mod url_validator;

use crate::codec::DEFAULT_ALPHABET;

/// 生成默认字母表的随机排列（Fisher–Yates）
///
/// 打乱后的字母表让连续 id 对应的 token 看起来没有规律。
pub fn generate_alphabet() -> String {
    let mut symbols: Vec<char> = DEFAULT_ALPHABET.chars().collect();
    for i in (1..symbols.len()).rev() {
        let j = rand::random_range(0..=i);
        symbols.swap(i, j);
    }
    symbols.into_iter().collect()
}
