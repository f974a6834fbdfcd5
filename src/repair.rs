//! Prospective download of extra repair blocks
//!
//! Jobs may hold back repair (PAR2) volumes until they are needed. As soon
//! as failed articles pile up, enough of those volumes are moved into the
//! active download that the repair pass will not have to wait for them.

use std::sync::Arc;
use tracing::info;

use crate::job::{ArticleLog, Job, NzbFile};

/// Number of repair blocks the job's failure logs call for
///
/// One block per bad, missing, killed or duplicate article.
pub fn blocks_needed(job: &Job) -> u64 {
    ArticleLog::ALL
        .iter()
        .map(|log| job.log_count(*log) as u64)
        .sum()
}

/// Number of repair blocks among the job's active files
pub fn blocks_present(job: &Job) -> u64 {
    job.files()
        .iter()
        .filter_map(|file| file.blocks())
        .map(u64::from)
        .sum()
}

/// Pick volumes from `available` until `present` reaches `needed`
///
/// Volumes are considered largest first. When one of the remaining volumes
/// covers the whole shortfall on its own, the smallest such volume is taken;
/// otherwise the largest one is. Returns the picked volumes in order and the
/// ones left over, largest first.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use yenc_decoder::NzbFile;
/// use yenc_decoder::repair::select_blocks;
///
/// let vol = |blocks| Arc::new(NzbFile::new("set.par2", Vec::new()).with_blocks(blocks));
/// let (picked, rest) = select_blocks(vec![vol(1), vol(5), vol(3)], 1, 3);
/// assert_eq!(picked.len(), 1);
/// assert_eq!(picked[0].blocks(), Some(3));
/// assert_eq!(rest.len(), 2);
/// ```
pub fn select_blocks(
    mut available: Vec<Arc<NzbFile>>,
    mut present: u64,
    needed: u64,
) -> (Vec<Arc<NzbFile>>, Vec<Arc<NzbFile>>) {
    available.sort_by_key(|file| std::cmp::Reverse(file.blocks().unwrap_or(0)));

    let mut picked = Vec::new();
    while present < needed && !available.is_empty() {
        let missing = needed - present;
        let index = available
            .iter()
            .rposition(|file| u64::from(file.blocks().unwrap_or(0)) >= missing)
            .unwrap_or(0);
        let file = available.remove(index);
        present += u64::from(file.blocks().unwrap_or(0));
        picked.push(file);
    }

    (picked, available)
}

/// Move held-back repair volumes into the download if the job needs them
///
/// The volumes come from the set whose name occurs in `file`'s name.
/// Returns the number of repair blocks added.
pub fn acquire_repair_blocks(job: &Job, file: &NzbFile) -> u64 {
    let needed = blocks_needed(job);
    let present = blocks_present(job);
    if present >= needed {
        return 0;
    }

    let Some(set_name) = job.par_set_for(&file.filename()) else {
        return 0;
    };

    let (picked, rest) = select_blocks(job.extra_pars(&set_name), present, needed);
    job.set_extra_pars(&set_name, rest);

    let mut added = 0;
    for volume in picked {
        let blocks = volume.blocks().unwrap_or(0);
        job.add_par_file(volume);
        added += u64::from(blocks);
        info!("Prospectively added {} repair blocks to {}", blocks, job.name());
    }
    added
}
