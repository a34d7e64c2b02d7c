pub mod bubble_chart;
