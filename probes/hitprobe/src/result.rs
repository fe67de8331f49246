//! 探测结果.

use crate::profile::Profile;
use conwhat::AtlasResult;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, top: usize, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.3}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Atlas `{name}`:")?;
    writeln!(w, "{S4}Entries probed: {}", p.get_probed())?;
    writeln!(w, "{S4}Entries hit: {}", p.get_hit())?;
    writeln!(w, "{S4}Skipped by bounding box: {}", p.get_skipped())?;
    writeln!(w, "{S4}Hit stats time: {} us", p.get_hit_time_us())?;
    writeln!(
        w,
        "{S4}Average time per read entry: {} us",
        f64_to_display(p.get_avg_read_time_us())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    write!(w, "{S4}Top entries by dice:")?;
    for r in p.top(top) {
        write!(
            w,
            "\n{S4}{S4}#{} `{}`: {} hits, dice {:.4}",
            r.idx, r.name, r.hits, r.dice
        )?;
    }
    Ok(())
}

/// 探测最终结果.
pub struct ProbeResult {
    data: Vec<(String, AtlasResult<Profile>)>,
}

impl ProbeResult {
    pub fn from_iter<I: IntoIterator<Item = (String, AtlasResult<Profile>)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 按图谱顺序迭代.
    pub fn iter(&self) -> impl Iterator<Item = &(String, AtlasResult<Profile>)> {
        self.data.iter()
    }

    /// 分析运行结果.
    pub fn analyze(&self, top: usize) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);

        for (key, profile) in self.data.iter() {
            match profile {
                Ok(p) => {
                    describe_into(key, p, top, &mut buf).unwrap();
                    println!("{}", String::from_utf8_lossy(&buf));
                    buf.clear();
                }
                Err(e) => println!("Atlas `{key}` failed: {e}"),
            }

            utils::sep();
        }
    }
}
