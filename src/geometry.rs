// 该文件是 Cheti （车体） 项目的一部分。
// src/geometry.rs - 旋转框几何量提取
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
  #[error("四边形退化: 面积为零")]
  ZeroArea,
  #[error("四边形包含非有限坐标")]
  NonFiniteVertex,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub const fn new(x: f64, y: f64) -> Self {
    Point { x, y }
  }

  /// 欧氏距离，按 `sqrt(dx² + dy²)` 逐步计算
  ///
  /// 两条短边中点到质心的距离理论上相等，取哪一条取决于最后一位的舍入，
  /// 所以这里不用 `hypot`。
  pub fn distance(&self, other: &Point) -> f64 {
    let dx = self.x - other.x;
    let dy = self.y - other.y;
    (dx * dx + dy * dy).sqrt()
  }

  pub fn midpoint(&self, other: &Point) -> Point {
    Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
  }

  fn is_finite(&self) -> bool {
    self.x.is_finite() && self.y.is_finite()
  }
}

/// 检测器输出的四个角点，保持检测器给出的环绕顺序
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
  pub corners: [Point; 4],
}

impl From<[f64; 8]> for Quad {
  fn from(v: [f64; 8]) -> Self {
    Quad {
      corners: [
        Point::new(v[0], v[1]),
        Point::new(v[2], v[3]),
        Point::new(v[4], v[5]),
        Point::new(v[6], v[7]),
      ],
    }
  }
}

/// 旋转矩形描述
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedRect {
  pub center_x: f64,
  pub center_y: f64,
  /// 长边，已换算单位
  pub length: f64,
  /// 短边，已换算单位
  pub width: f64,
  /// 自 x 轴正方向逆时针，单位为度，范围 (-180, 180]
  pub angle_degrees: f64,
}

impl Quad {
  fn edges(&self) -> impl Iterator<Item = (&Point, &Point)> {
    self
      .corners
      .iter()
      .zip(self.corners.iter().cycle().skip(1))
  }

  /// 多边形面积加权质心
  ///
  /// 以第一个角点为基点做三角形扇分解，等价于鞋带公式，但在地图坐标
  /// 数值很大时损失的精度更少。结果按 `sum / 3 / area2` 的顺序相除。
  ///
  /// 面积为零的四边形（重合或共线的角点）直接报错，不退化为线段或点的
  /// 质心；GEOS 在这种情况下会退化处理，共线四边形仍能得到长宽并参与匹配。
  pub fn centroid(&self) -> Result<Point, GeometryError> {
    if !self.corners.iter().all(Point::is_finite) {
      return Err(GeometryError::NonFiniteVertex);
    }

    let base = self.corners[0];
    let mut area2 = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for pair in self.corners[1..].windows(2) {
      let (a, b) = (pair[0], pair[1]);
      let cross = (a.x - base.x) * (b.y - base.y) - (b.x - base.x) * (a.y - base.y);
      area2 += cross;
      sum_x += cross * (base.x + a.x + b.x);
      sum_y += cross * (base.y + a.y + b.y);
    }

    if area2 == 0.0 || !area2.is_finite() {
      return Err(GeometryError::ZeroArea);
    }

    Ok(Point::new(sum_x / 3.0 / area2, sum_y / 3.0 / area2))
  }

  /// 以离质心最远的边中点的方位角作为旋转角
  ///
  /// 注意这里取的是中点位置本身的 `atan2`，不是边的方向向量。
  /// 距离相同时取迭代顺序中的第一条边。
  pub fn farthest_edge_angle(&self, centroid: &Point) -> f64 {
    let mut best_dist = f64::NEG_INFINITY;
    let mut best_angle = 0.0;
    for (a, b) in self.edges() {
      let mid = a.midpoint(b);
      let dist = mid.distance(centroid);
      if dist > best_dist {
        best_dist = dist;
        best_angle = mid.y.atan2(mid.x);
      }
    }

    let degrees = best_angle.to_degrees();
    if degrees <= -180.0 { degrees + 360.0 } else { degrees }
  }

  /// 提取旋转矩形，长宽按 `unit_scale` 换算
  ///
  /// 假定输入近似为矩形，只测量第一个角点相邻的两条边。
  pub fn oriented_rect(&self, unit_scale: f64) -> Result<OrientedRect, GeometryError> {
    let center = self.centroid()?;

    let [p0, p1, _, p3] = &self.corners;
    let side_a = p0.distance(p1);
    let side_b = p0.distance(p3);

    Ok(OrientedRect {
      center_x: center.x,
      center_y: center.y,
      length: unit_scale * side_a.max(side_b),
      width: unit_scale * side_a.min(side_b),
      angle_degrees: self.farthest_edge_angle(&center),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn quad(v: [f64; 8]) -> Quad {
    Quad::from(v)
  }

  #[test]
  fn unit_square_has_unit_sides() {
    let rect = quad([0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0])
      .oriented_rect(1.0)
      .unwrap();
    assert_eq!(rect.length, 1.0);
    assert_eq!(rect.width, 1.0);
    assert!((rect.center_x - 0.5).abs() < 1e-12);
    assert!((rect.center_y - 0.5).abs() < 1e-12);
  }

  #[test]
  fn axis_aligned_rectangles_keep_true_center() {
    let cases = [
      [0.0, 0.0, 10.0, 0.0, 10.0, 5.0, 0.0, 5.0],
      [2.0, 3.0, 2.0, 11.0, 5.0, 11.0, 5.0, 3.0],
      [100.0, 50.0, 40.0, 50.0, 40.0, 20.0, 100.0, 20.0],
    ];
    for v in cases {
      let rect = quad(v).oriented_rect(0.1).unwrap();
      let xs = [v[0], v[2], v[4], v[6]];
      let ys = [v[1], v[3], v[5], v[7]];
      let cx = (xs.iter().cloned().fold(f64::MAX, f64::min)
        + xs.iter().cloned().fold(f64::MIN, f64::max))
        / 2.0;
      let cy = (ys.iter().cloned().fold(f64::MAX, f64::min)
        + ys.iter().cloned().fold(f64::MIN, f64::max))
        / 2.0;
      assert!(rect.length >= rect.width, "{:?}", rect);
      assert!((rect.center_x - cx).abs() < 1e-9, "{:?}", rect);
      assert!((rect.center_y - cy).abs() < 1e-9, "{:?}", rect);
    }
  }

  #[test]
  fn centroid_is_area_weighted_not_vertex_mean() {
    // 直角梯形，顶点均值为 (1.5, 1.0)
    let q = quad([0.0, 0.0, 4.0, 0.0, 2.0, 2.0, 0.0, 2.0]);
    let c = q.centroid().unwrap();
    // 面积 6，质心 x = 14/9
    assert!((c.x - 14.0 / 9.0).abs() < 1e-12);
    assert!((c.y - 8.0 / 9.0).abs() < 1e-12);
  }

  #[test]
  fn centroid_independent_of_winding() {
    let ccw = quad([0.0, 0.0, 10.0, 0.0, 10.0, 5.0, 0.0, 5.0]).centroid().unwrap();
    let cw = quad([0.0, 0.0, 0.0, 5.0, 10.0, 5.0, 10.0, 0.0]).centroid().unwrap();
    assert!((ccw.x - cw.x).abs() < 1e-12);
    assert!((ccw.y - cw.y).abs() < 1e-12);
  }

  #[test]
  fn angle_uses_farthest_edge_midpoint_position() {
    // 质心 (5, 2.5)，短边中点 (10, 2.5) 与 (0, 2.5) 距离均为 5；
    // 第一条达到最大值的边是 p1-p2，中点 (10, 2.5)
    let rect = quad([0.0, 0.0, 10.0, 0.0, 10.0, 5.0, 0.0, 5.0])
      .oriented_rect(0.1)
      .unwrap();
    let expected = 2.5f64.atan2(10.0).to_degrees();
    assert!((rect.angle_degrees - expected).abs() < 1e-12);
  }

  #[test]
  fn angle_tie_breaks_on_first_edge() {
    // 正方形四条边中点到质心等距，取 p0-p1 的中点 (1, 0)
    let rect = quad([0.0, -1.0, 2.0, 1.0, 0.0, 3.0, -2.0, 1.0])
      .oriented_rect(1.0)
      .unwrap();
    assert_eq!(rect.angle_degrees, 0.0);
  }

  #[test]
  fn angle_never_reports_minus_180() {
    // 四条边中点等距，取第一条边中点 (-10, -0.0)，atan2 给出 -π
    let q = Quad {
      corners: [
        Point::new(-10.0, -0.0),
        Point::new(-10.0, -0.0),
        Point::new(-9.0, -1.0),
        Point::new(-9.0, 1.0),
      ],
    };
    let c = Point::new(-9.5, 0.0);
    let angle = q.farthest_edge_angle(&c);
    assert!(angle > 0.0 && (angle - 180.0).abs() < 1e-9, "{}", angle);
  }

  #[test]
  fn angle_is_deterministic() {
    let q = quad([3.0, 1.0, 9.0, 4.0, 7.5, 7.0, 1.5, 4.0]);
    let a = q.oriented_rect(0.1).unwrap();
    let b = q.oriented_rect(0.1).unwrap();
    assert_eq!(a.angle_degrees.to_bits(), b.angle_degrees.to_bits());
  }

  #[test]
  fn map_scale_rotated_rectangle_picks_stable_short_edge() {
    // 两条短边中点到质心的距离只差最后一位，期望值按
    // `sum / 3 / area2` 与 `sqrt(dx*dx + dy*dy)` 逐步计算得到：
    // 选中 p3-p0 的中点，而不是 p1-p2 的中点（约 70.0123°）
    let q = quad([
      1091.2906399794801,
      3144.83960422109,
      1130.2866757352072,
      3115.2453341315663,
      1141.0990060906652,
      3129.4926198348026,
      1102.1029703349382,
      3159.0868899243264,
    ]);
    let rect = q.oriented_rect(0.1).unwrap();
    assert!((rect.angle_degrees - 70.81512585636892).abs() < 1e-6, "{:?}", rect);
  }

  #[test]
  fn distance_is_plain_square_root() {
    let a = Point::new(1102.1029703349382, 3159.0868899243264);
    let b = Point::new(1116.0, 3137.0);
    let (dx, dy) = (a.x - b.x, a.y - b.y);
    assert_eq!(a.distance(&b).to_bits(), (dx * dx + dy * dy).sqrt().to_bits());
  }

  #[test]
  fn coincident_points_are_degenerate() {
    let q = quad([1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
    assert_eq!(q.oriented_rect(0.1), Err(GeometryError::ZeroArea));
  }

  #[test]
  fn collinear_points_are_degenerate() {
    let q = quad([0.0, 0.0, 1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);
    assert_eq!(q.centroid(), Err(GeometryError::ZeroArea));
  }

  #[test]
  fn nan_vertex_is_rejected() {
    let q = quad([0.0, 0.0, f64::NAN, 0.0, 1.0, 1.0, 0.0, 1.0]);
    assert_eq!(q.centroid(), Err(GeometryError::NonFiniteVertex));
  }
}
