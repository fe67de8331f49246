//! 空白分隔的文本数值文件.
//!
//! 空行与以 `#` 开头的行会被忽略. 报错时的行号从 1 开始, 指向原文件中的行.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use ndarray::Array2;

use crate::error::LoadError;

/// 读取文件中所有有效行, 附带原始行号.
fn lines(path: &Path) -> Result<Vec<(usize, String)>, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
        .map(|(i, l)| (i, l.to_owned()))
        .collect())
}

fn parse_err(path: &Path, line: usize, reason: String) -> LoadError {
    LoadError::Parse {
        path: path.to_owned(),
        line,
        reason,
    }
}

/// 读取矩阵. 每行列数必须一致.
pub fn read_matrix(path: &Path) -> Result<Array2<f64>, LoadError> {
    let rows = lines(path)?;
    let mut ncols = None;
    let mut data = Vec::new();
    for (line, text) in rows.iter() {
        let before = data.len();
        for tok in text.split_whitespace() {
            let v = tok
                .parse::<f64>()
                .map_err(|e| parse_err(path, *line, format!("`{tok}`: {e}")))?;
            data.push(v);
        }
        let width = data.len() - before;
        match ncols {
            None => ncols = Some(width),
            Some(n) if n != width => {
                return Err(parse_err(path, *line, format!("期望 {n} 列, 实际 {width} 列")));
            }
            _ => {}
        }
    }
    let shape = (rows.len(), ncols.unwrap_or(0));
    Array2::from_shape_vec(shape, data).map_err(|e| parse_err(path, 0, e.to_string()))
}

/// 读取每行一个值的列.
pub fn read_column<T>(path: &Path) -> Result<Vec<T>, LoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lines(path)?
        .into_iter()
        .map(|(line, text)| {
            text.parse::<T>()
                .map_err(|e| parse_err(path, line, format!("`{text}`: {e}")))
        })
        .collect()
}

/// 读取每行一个标签. 标签内部可以包含空白.
pub fn read_labels(path: &Path) -> Result<Vec<String>, LoadError> {
    Ok(lines(path)?.into_iter().map(|(_, l)| l).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LoadError;

    #[test]
    fn test_read_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("w.txt");
        fs::write(&p, "# weights\n0 1 2\n\n1 0 3.5\n2 3.5 0\n").unwrap();
        let m = read_matrix(&p).unwrap();
        assert_eq!(m.dim(), (3, 3));
        assert_eq!(m[(1, 2)], 3.5);

        fs::write(&p, "0 1\n1 0 2\n").unwrap();
        assert!(matches!(read_matrix(&p), Err(LoadError::Parse { line: 2, .. })));

        fs::write(&p, "0 x\n").unwrap();
        assert!(matches!(read_matrix(&p), Err(LoadError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_read_column_and_labels() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("c.txt");
        fs::write(&p, "1\n0\n1\n").unwrap();
        assert_eq!(read_column::<u8>(&p).unwrap(), vec![1, 0, 1]);

        fs::write(&p, "Left Thalamus\nctx-lh-insula\n").unwrap();
        assert_eq!(read_labels(&p).unwrap(), vec!["Left Thalamus", "ctx-lh-insula"]);

        let missing = dir.path().join("none.txt");
        assert!(matches!(read_labels(&missing), Err(LoadError::Io { .. })));
    }
}
