// ==========================================
// Cusmon 表格数据管理 - 表格源读取器
// ==========================================
// 职责: 在原始二维表格中定位表头锚点，惰性产出列名与数据行
// 锚点搜索（按顺序，首个命中获胜；行从 1 开始，第 0 行视为标题行）:
// 1. 2×2 全非空块的左上角
// 2. 纵向 2×1 非空对的上格
// 3. 任意非空单元格
// 4. (0, 0)
// ==========================================

use crate::domain::{CellValue, Grid};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 表头锚点（表头行、首列）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Anchor {
    pub row: usize,
    pub col: usize,
}

impl Anchor {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

fn cell(grid: &Grid, row: usize, col: usize) -> Option<&CellValue> {
    grid.get(row).and_then(|r| r.get(col))
}

fn filled(grid: &Grid, row: usize, col: usize) -> bool {
    cell(grid, row, col).is_some_and(|c| !c.is_empty())
}

/// 定位表头锚点
pub fn find_anchor(grid: &Grid) -> Anchor {
    let rows = grid.len();

    // 2×2 块
    for r in 1..rows.saturating_sub(1) {
        for c in 0..grid[r].len().saturating_sub(1) {
            if filled(grid, r, c)
                && filled(grid, r + 1, c)
                && filled(grid, r, c + 1)
                && filled(grid, r + 1, c + 1)
            {
                debug!(row = r, col = c, "锚点: 2x2 块");
                return Anchor::new(r, c);
            }
        }
    }

    // 2×1 纵向对
    for r in 1..rows.saturating_sub(1) {
        for c in 0..grid[r].len() {
            if filled(grid, r, c) && filled(grid, r + 1, c) {
                debug!(row = r, col = c, "锚点: 2x1 纵向对");
                return Anchor::new(r, c);
            }
        }
    }

    // 任意非空
    for r in 1..rows {
        for c in 0..grid[r].len() {
            if filled(grid, r, c) {
                debug!(row = r, col = c, "锚点: 单个非空单元格");
                return Anchor::new(r, c);
            }
        }
    }

    Anchor::default()
}

// ==========================================
// ColumnNames - 列名惰性序列
// ==========================================
// 自锚点向右连续非空单元格，遇空即止
pub struct ColumnNames<'a> {
    grid: &'a Grid,
    row: usize,
    next_col: usize,
    done: bool,
}

impl Iterator for ColumnNames<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match cell(self.grid, self.row, self.next_col) {
            Some(c) if !c.is_empty() => {
                self.next_col += 1;
                Some(c.to_text())
            }
            _ => {
                self.done = true;
                None
            }
        }
    }
}

pub fn column_names(grid: &Grid, anchor: Anchor) -> ColumnNames<'_> {
    ColumnNames {
        grid,
        row: anchor.row,
        next_col: anchor.col,
        done: false,
    }
}

// ==========================================
// DataRows - 数据行惰性序列
// ==========================================
// 自表头下一行起，每行截取 [col, col + column_count)；
// 截取部分全为空白时终止
pub struct DataRows<'a> {
    grid: &'a Grid,
    next_row: usize,
    col: usize,
    column_count: usize,
    done: bool,
}

impl<'a> Iterator for DataRows<'a> {
    type Item = &'a [CellValue];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(row) = self.grid.get(self.next_row) else {
            self.done = true;
            return None;
        };
        let start = self.col.min(row.len());
        let end = self.col.saturating_add(self.column_count).min(row.len());
        let slice = &row[start..end];
        if slice.iter().all(CellValue::is_blank) {
            self.done = true;
            return None;
        }
        self.next_row += 1;
        Some(slice)
    }
}

pub fn data_rows(grid: &Grid, anchor: Anchor, column_count: usize) -> DataRows<'_> {
    DataRows {
        grid,
        next_row: anchor.row + 1,
        col: anchor.col,
        column_count,
        done: false,
    }
}

// ==========================================
// TabularSource - 检测结果
// ==========================================
#[derive(Debug, Clone)]
pub struct TabularSource<'a> {
    grid: &'a Grid,
    anchor: Anchor,
    columns: Vec<String>,
}

impl<'a> TabularSource<'a> {
    /// 定位锚点并读取列名
    pub fn detect(grid: &'a Grid) -> Self {
        let anchor = find_anchor(grid);
        let columns: Vec<String> = column_names(grid, anchor).collect();
        debug!(row = anchor.row, col = anchor.col, columns = columns.len(), "表头检测完成");
        Self {
            grid,
            anchor,
            columns,
        }
    }

    /// 使用已知锚点（重新读取列名）
    pub fn at(grid: &'a Grid, anchor: Anchor) -> Self {
        let columns = column_names(grid, anchor).collect();
        Self {
            grid,
            anchor,
            columns,
        }
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn grid(&self) -> &'a Grid {
        self.grid
    }

    /// 每次调用返回一个新的一次性序列
    pub fn rows(&self) -> DataRows<'a> {
        data_rows(self.grid, self.anchor, self.columns.len())
    }

    /// 第一条数据行在某列的示例值
    pub fn sample(&self, column_index: usize) -> Option<String> {
        cell(self.grid, self.anchor.row + 1, self.anchor.col + column_index)
            .filter(|c| !c.is_empty())
            .map(CellValue::to_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| r.iter().map(|c| if c.is_empty() { CellValue::Empty } else { CellValue::from(*c) }).collect())
            .collect()
    }

    #[test]
    fn test_anchor_prefers_two_by_two_block() {
        let g = grid(&[
            &["Report"],
            &["", "note", ""],
            &["", "x", "Name", "Code"],
            &["", "", "Alice", "X1"],
        ]);
        assert_eq!(find_anchor(&g), Anchor::new(2, 2));
    }

    #[test]
    fn test_anchor_skips_row_zero() {
        let g = grid(&[&["A", "B"], &["C", "D"]]);
        // 第 0 行不参与；第 1 行之后无下一行，只剩单格匹配
        assert_eq!(find_anchor(&g), Anchor::new(1, 0));
    }

    #[test]
    fn test_anchor_vertical_pair() {
        let g = grid(&[&["Title"], &["", "Name"], &["", "Alice"]]);
        assert_eq!(find_anchor(&g), Anchor::new(1, 1));
    }

    #[test]
    fn test_anchor_single_cell() {
        let g = grid(&[&["Title"], &[""], &["", "", "lonely"]]);
        assert_eq!(find_anchor(&g), Anchor::new(2, 2));
    }

    #[test]
    fn test_empty_sheet_defaults_to_origin() {
        let g: Grid = vec![vec![], vec![CellValue::Empty]];
        let source = TabularSource::detect(&g);
        assert_eq!(source.anchor(), Anchor::new(0, 0));
        assert!(source.columns().is_empty());
        assert_eq!(source.rows().count(), 0);
    }

    #[test]
    fn test_columns_stop_at_first_empty() {
        let g = grid(&[&["T"], &["Name", "Code", "", "Ignored"], &["Alice", "X1", "", "z"]]);
        let source = TabularSource::detect(&g);
        assert_eq!(source.columns(), &["Name".to_string(), "Code".to_string()]);
    }

    #[test]
    fn test_data_rows_stop_at_blank_row() {
        let g = grid(&[
            &["T"],
            &["Name", "Code"],
            &["Alice", "X1"],
            &["Bob", "X2"],
            &["  ", ""],
            &["Carol", "X3"],
        ]);
        let source = TabularSource::detect(&g);
        let rows: Vec<Vec<String>> = source
            .rows()
            .map(|r| r.iter().map(CellValue::to_text).collect())
            .collect();
        assert_eq!(rows, vec![vec!["Alice", "X1"], vec!["Bob", "X2"]]);
        // 每次调用都是新的序列
        assert_eq!(source.rows().count(), 2);
        assert_eq!(source.sample(1), Some("X1".to_string()));
    }

    #[test]
    fn test_data_rows_short_row_is_truncated_not_padded() {
        let g = grid(&[&["T"], &["Name", "Code"], &["Alice"], &[""]]);
        let source = TabularSource::detect(&g);
        let rows: Vec<&[CellValue]> = source.rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 1);
    }
}
