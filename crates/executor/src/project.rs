//! `projection`: selects and reorders columns from a source `DbFile` into
//! an output `DbFile`.

use common::{DbResult, Tuple};
use storage::DbFile;

/// For every tuple yielded by `input`, resolves each name in `field_names`
/// to a column index once and emits a tuple of exactly those fields in the
/// requested order. Names may repeat to replicate a column. Unknown names
/// fail with `SchemaMiss`.
pub fn projection(
    input: &mut dyn DbFile,
    output: &mut dyn DbFile,
    field_names: &[&str],
) -> DbResult<()> {
    let indices: Vec<usize> = field_names
        .iter()
        .map(|name| input.tuple_desc().index_of(name))
        .collect::<DbResult<_>>()?;

    let source_tuples: Vec<Tuple> = input.iter_tuples().collect::<DbResult<_>>()?;

    for tuple in source_tuples {
        let values = indices
            .iter()
            .map(|&i| tuple.get_field(i).map(|v| v.clone()))
            .collect::<DbResult<Vec<_>>>()?;
        output.insert_tuple(Tuple::new(values))?;
    }
    Ok(())
}
